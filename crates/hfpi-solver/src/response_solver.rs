//! Modal response of one building under one set of scaled wind forces.
//!
//! The pipeline runs per active mode:
//!
//! ```text
//! forces ──project──▶ F_m(t) ──integrate──▶ x_m(t) ──expand──▶ response_m
//! ```
//!
//! and superposes every mode's response into a [`CaseResult`]. The equation
//! of motion is written for unit generalized mass, so the shapes are expected
//! to be mass-normalized (see [`StructuralModel::normalize`]).
//!
//! # Example
//!
//! ```no_run
//! use hfpi_model::{DimensionalParameters, ForcesData, StructuralModel};
//! use hfpi_solver::{IntegratorKind, ResponseSolver};
//!
//! # fn example(structure: StructuralModel, raw: ForcesData) -> hfpi_solver::Result<()> {
//! let dims = DimensionalParameters::new(38.0, 120.0, 30.0)?.with_damping_ratio(0.02)?;
//! let solver = ResponseSolver::from_unscaled(&structure, &raw, &dims)?;
//! let result = solver.solve(&IntegratorKind::RungeKutta)?;
//! println!("{} samples x {} floors", result.num_samples(), result.num_floors());
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;

use hfpi_model::{CaseResult, DimensionalParameters, ForcesData, ModelError, StructuralModel};
use log::debug;

use crate::error::{Result, SolverError};
use crate::expansion::{ModalResponse, combine_modes};
use crate::integrator::ModalIntegrator;
use crate::projector::project_forces;

pub struct ResponseSolver<'a> {
    structure: &'a StructuralModel,
    forces: Cow<'a, ForcesData>,
    damping_ratio: f64,
}

impl<'a> ResponseSolver<'a> {
    /// Solver over forces that are already dimensional.
    ///
    /// # Errors
    /// Returns [`ModelError::NotScaled`] when `forces` is still non-dimensional.
    pub fn new(structure: &'a StructuralModel, forces: &'a ForcesData, damping_ratio: f64) -> Result<Self> {
        if !forces.is_scaled() {
            return Err(ModelError::NotScaled.into());
        }
        if !(damping_ratio >= 0.0 && damping_ratio.is_finite()) {
            return Err(SolverError::InvalidDamping(damping_ratio));
        }
        Ok(Self {
            structure,
            forces: Cow::Borrowed(forces),
            damping_ratio,
        })
    }

    /// Scales `raw` with `dims` and takes the damping ratio from `dims`.
    ///
    /// # Errors
    /// Returns [`ModelError::AlreadyScaled`] when `raw` is already dimensional.
    pub fn from_unscaled(
        structure: &'a StructuralModel,
        raw: &ForcesData,
        dims: &DimensionalParameters,
    ) -> Result<Self> {
        let scaled = raw.scale(dims)?;
        Ok(Self {
            structure,
            forces: Cow::Owned(scaled),
            damping_ratio: dims.damping_ratio,
        })
    }

    pub fn forces(&self) -> &ForcesData {
        &self.forces
    }

    pub fn damping_ratio(&self) -> f64 {
        self.damping_ratio
    }

    /// Per-mode responses, in active-mode order.
    pub fn modal_responses(&self, integrator: &dyn ModalIntegrator) -> Result<Vec<ModalResponse>> {
        let dt = self.forces.time_step()?;
        let generalized = project_forces(&self.forces, self.structure)?;
        let floors = self.structure.floors();

        self.structure
            .active_modes()
            .zip(generalized.iter())
            .map(|((mode, shape), force)| -> Result<ModalResponse> {
                let wp = mode.angular_frequency();
                debug!(
                    "mode {}: T = {:.3} s, wp = {wp:.4} rad/s, dt = {dt:.5} s, {} samples",
                    mode.id,
                    mode.period,
                    force.len()
                );
                let x_gen = integrator.integrate(force.as_slice(), dt, wp, self.damping_ratio)?;
                ModalResponse::new(&x_gen, shape, floors, wp)
            })
            .collect()
    }

    /// Superposed response of every active mode.
    pub fn solve(&self, integrator: &dyn ModalIntegrator) -> Result<CaseResult> {
        let responses = self.modal_responses(integrator)?;
        combine_modes(&responses)
    }
}
