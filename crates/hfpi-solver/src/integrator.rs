//! Single-degree-of-freedom modal integration.
//!
//! Solves the equation of motion of one mode with unit generalized mass:
//!
//! ```text
//! x'' + 2·ξ·ωp·x' + ωp²·x = F(t)
//! ```
//!
//! Two schemes are provided:
//! - [`Recurrence`]: explicit central-difference recurrence on the sample
//!   grid. Cheap, conditionally stable (ωp·Δt < 2).
//! - [`RungeKutta`]: adaptive Dormand–Prince 5(4) on the first-order system
//!   (x, v) with the force held constant between samples. This is the
//!   reference scheme.
//!
//! Both start from the static equilibrium of the mean force, so a stationary
//! history does not excite a start-up transient.

use log::debug;
use nalgebra::{DVector, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

pub trait ModalIntegrator: Send + Sync {
    /// Generalized displacement at every sample of `force`.
    ///
    /// # Arguments
    /// * `force` - Generalized force history, uniformly sampled
    /// * `dt` - Sampling interval (s)
    /// * `wp` - Modal angular frequency (rad/s)
    /// * `xi` - Damping ratio
    fn integrate(&self, force: &[f64], dt: f64, wp: f64, xi: f64) -> Result<DVector<f64>>;
}

/// Integration scheme selected by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    Recurrence,
    #[default]
    RungeKutta,
}

impl ModalIntegrator for IntegratorKind {
    fn integrate(&self, force: &[f64], dt: f64, wp: f64, xi: f64) -> Result<DVector<f64>> {
        match self {
            IntegratorKind::Recurrence => Recurrence.integrate(force, dt, wp, xi),
            IntegratorKind::RungeKutta => RungeKutta::default().integrate(force, dt, wp, xi),
        }
    }
}

/// Central-difference recurrence:
///
/// ```text
/// x[i] = (F[i-1] + b·x[i-1] + c·x[i-2]) / a
/// a = 1/Δt² + ξωp/Δt,  b = 2/Δt² − ωp²,  c = ξωp/Δt − 1/Δt²
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Recurrence;

impl ModalIntegrator for Recurrence {
    fn integrate(&self, force: &[f64], dt: f64, wp: f64, xi: f64) -> Result<DVector<f64>> {
        check_inputs(force, dt, wp, xi)?;
        if wp * dt >= 2.0 {
            return Err(SolverError::Unstable(wp * dt));
        }

        let n = force.len();
        let mut x = DVector::zeros(n);
        if n == 0 {
            return Ok(x);
        }

        let x0 = equilibrium_guess(force, wp);
        x[0] = x0;
        if n > 1 {
            x[1] = x0;
        }

        let dt2 = dt * dt;
        let a = 1.0 / dt2 + xi * wp / dt;
        let b = 2.0 / dt2 - wp * wp;
        let c = xi * wp / dt - 1.0 / dt2;

        for i in 2..n {
            x[i] = (force[i - 1] + b * x[i - 1] + c * x[i - 2]) / a;
            if !x[i].is_finite() {
                return Err(SolverError::Diverged(i));
            }
        }
        Ok(x)
    }
}

/// Adaptive Dormand–Prince 5(4) integrator.
#[derive(Debug, Clone, Copy)]
pub struct RungeKutta {
    /// Relative tolerance on each state component
    pub rtol: f64,
    /// Absolute tolerance on each state component
    pub atol: f64,
    /// Substep budget per sampling interval
    pub max_substeps: usize,
}

impl Default for RungeKutta {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-12,
            max_substeps: 10_000,
        }
    }
}

// Dormand–Prince tableau
const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;
// 5th minus embedded 4th order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

impl RungeKutta {
    fn step(&self, y: &Vector2<f64>, h: f64, rhs: &impl Fn(&Vector2<f64>) -> Vector2<f64>) -> (Vector2<f64>, f64) {
        let k1 = rhs(y);
        let k2 = rhs(&(y + h * A21 * k1));
        let k3 = rhs(&(y + h * (A31 * k1 + A32 * k2)));
        let k4 = rhs(&(y + h * (A41 * k1 + A42 * k2 + A43 * k3)));
        let k5 = rhs(&(y + h * (A51 * k1 + A52 * k2 + A53 * k3 + A54 * k4)));
        let k6 = rhs(&(y + h * (A61 * k1 + A62 * k2 + A63 * k3 + A64 * k4 + A65 * k5)));
        let next = y + h * (B1 * k1 + B3 * k3 + B4 * k4 + B5 * k5 + B6 * k6);
        let k7 = rhs(&next);

        let err = h * (E1 * k1 + E3 * k3 + E4 * k4 + E5 * k5 + E6 * k6 + E7 * k7);
        let norm = (0..2)
            .map(|j| {
                let scale = self.atol + self.rtol * y[j].abs().max(next[j].abs());
                (err[j] / scale).abs()
            })
            .fold(0.0, f64::max);
        (next, norm)
    }
}

impl ModalIntegrator for RungeKutta {
    fn integrate(&self, force: &[f64], dt: f64, wp: f64, xi: f64) -> Result<DVector<f64>> {
        check_inputs(force, dt, wp, xi)?;

        let n = force.len();
        let mut x = DVector::zeros(n);
        if n == 0 {
            return Ok(x);
        }

        let mut y = Vector2::new(equilibrium_guess(force, wp), initial_velocity(force, dt, wp));
        x[0] = y[0];

        let stiffness = wp * wp;
        let damping = 2.0 * xi * wp;
        let mut h = dt;
        let mut substeps_total = 0usize;

        for interval in 0..n - 1 {
            // zero-order hold: F[interval] acts until the next sample
            let f = force[interval];
            let rhs = |s: &Vector2<f64>| Vector2::new(s[1], f - damping * s[1] - stiffness * s[0]);

            let mut t = 0.0;
            let mut substeps = 0usize;
            while t < dt {
                if substeps >= self.max_substeps {
                    return Err(SolverError::StepLimit {
                        limit: self.max_substeps,
                        interval,
                    });
                }
                substeps += 1;

                let h_try = h.min(dt - t);
                let (next, err) = self.step(&y, h_try, &rhs);
                if !err.is_finite() || !next[0].is_finite() {
                    return Err(SolverError::Diverged(interval + 1));
                }

                if err <= 1.0 {
                    t += h_try;
                    y = next;
                    // snap the last substep onto the grid
                    if dt - t <= dt * 1e-12 {
                        t = dt;
                    }
                }
                let factor = if err == 0.0 {
                    5.0
                } else {
                    (0.9 * err.powf(-0.2)).clamp(0.2, 5.0)
                };
                h = (h_try * factor).min(dt);
            }
            substeps_total += substeps;
            x[interval + 1] = y[0];
        }

        debug!(
            "runge-kutta: {} samples, {} substeps (wp={wp:.4}, xi={xi})",
            n, substeps_total
        );
        Ok(x)
    }
}

fn check_inputs(force: &[f64], dt: f64, wp: f64, xi: f64) -> Result<()> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(SolverError::InvalidTimeStep(dt));
    }
    if !(wp.is_finite() && wp > 0.0) {
        return Err(SolverError::InvalidFrequency(wp));
    }
    if !(xi.is_finite() && xi >= 0.0) {
        return Err(SolverError::InvalidDamping(xi));
    }
    // a non-finite load poisons every later sample
    if let Some(i) = force.iter().position(|f| !f.is_finite()) {
        return Err(SolverError::Diverged(i));
    }
    Ok(())
}

/// `num / den`, or zero when the denominator vanishes.
fn guarded_div(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

fn mean(values: &[f64]) -> f64 {
    guarded_div(values.iter().sum(), values.len() as f64)
}

/// Static displacement under the mean force, mean(F)/ωp².
pub fn equilibrium_guess(force: &[f64], wp: f64) -> f64 {
    guarded_div(mean(force), wp * wp)
}

/// Quasi-static velocity, mean(ΔF/Δt)/ωp².
pub fn initial_velocity(force: &[f64], dt: f64, wp: f64) -> f64 {
    if force.len() < 2 {
        return 0.0;
    }
    let rate = guarded_div(force[force.len() - 1] - force[0], dt * (force.len() - 1) as f64);
    guarded_div(rate, wp * wp)
}
