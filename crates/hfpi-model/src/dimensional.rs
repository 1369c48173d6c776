//! Conversion factors between non-dimensional CFD/wind-tunnel output and
//! physical units.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

pub const DEFAULT_DAMPING_RATIO: f64 = 0.02;
/// Standard air density at sea level (kg/m³)
pub const DEFAULT_AIR_DENSITY: f64 = 1.226;

/// Reference quantities of one analysis case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionalParameters {
    /// Reference velocity at building height U_H (m/s)
    pub u_h: f64,
    /// Building height H (m)
    pub height: f64,
    /// Building base dimension B (m)
    pub base: f64,
    /// Critical damping ratio ξ
    pub damping_ratio: f64,
    /// Air density ρ (kg/m³)
    pub air_density: f64,
}

impl DimensionalParameters {
    pub fn new(u_h: f64, height: f64, base: f64) -> Result<Self> {
        Self {
            u_h,
            height,
            base,
            damping_ratio: DEFAULT_DAMPING_RATIO,
            air_density: DEFAULT_AIR_DENSITY,
        }
        .validated()
    }

    pub fn with_damping_ratio(mut self, damping_ratio: f64) -> Result<Self> {
        self.damping_ratio = damping_ratio;
        self.validated()
    }

    pub fn with_air_density(mut self, air_density: f64) -> Result<Self> {
        self.air_density = air_density;
        self.validated()
    }

    fn validated(self) -> Result<Self> {
        let positive = [
            ("u_h", self.u_h),
            ("height", self.height),
            ("base", self.base),
            ("air_density", self.air_density),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ModelError::InvalidInput(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !self.damping_ratio.is_finite() || self.damping_ratio < 0.0 {
            return Err(ModelError::InvalidInput(format!(
                "damping ratio must be non-negative, got {}",
                self.damping_ratio
            )));
        }
        Ok(self)
    }

    /// q = ½·ρ·U_H² (Pa)
    pub fn dynamic_pressure(&self) -> f64 {
        0.5 * self.air_density * self.u_h * self.u_h
    }

    /// Seconds per unit of normalized time (H / U_H).
    pub fn time_scale(&self) -> f64 {
        self.height / self.u_h
    }

    /// q·B·H (N per unit force coefficient)
    pub fn force_factor(&self) -> f64 {
        self.dynamic_pressure() * self.base * self.height
    }

    /// q·B²·H (N·m per unit moment coefficient)
    pub fn moment_factor(&self) -> f64 {
        self.dynamic_pressure() * self.base * self.base * self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn derives_scale_factors() {
        let dims = DimensionalParameters::new(40.0, 120.0, 30.0).unwrap();
        let q = 0.5 * 1.226 * 1600.0;
        assert_relative_eq!(dims.dynamic_pressure(), q);
        assert_relative_eq!(dims.time_scale(), 3.0);
        assert_relative_eq!(dims.force_factor(), q * 30.0 * 120.0);
        assert_relative_eq!(dims.moment_factor(), q * 900.0 * 120.0);
        assert_eq!(dims.damping_ratio, DEFAULT_DAMPING_RATIO);
    }

    #[test]
    fn rejects_zero_velocity_and_negative_damping() {
        assert!(DimensionalParameters::new(0.0, 120.0, 30.0).is_err());
        let dims = DimensionalParameters::new(40.0, 120.0, 30.0).unwrap();
        assert!(dims.with_damping_ratio(-0.01).is_err());
        assert_eq!(dims.with_damping_ratio(0.05).unwrap().damping_ratio, 0.05);
    }
}
