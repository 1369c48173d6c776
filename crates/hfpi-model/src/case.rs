//! Analysis-case keys and per-case results.

use std::fmt;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::structure::Floor;

/// One value per structural axis: x, y translation and z rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axes<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T> Axes<T> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Axes<U> {
        Axes {
            x: f(self.x),
            y: f(self.y),
            z: f(self.z),
        }
    }

    pub fn view(&self) -> Axes<&T> {
        Axes {
            x: &self.x,
            y: &self.y,
            z: &self.z,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, &T)> {
        [(Axis::X, &self.x), (Axis::Y, &self.y), (Axis::Z, &self.z)].into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn as_str(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// The three sweep axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Direction,
    DampingRatio,
    RecurrencePeriod,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaseParameters {
    /// Wind direction (degrees)
    pub direction: f64,
    pub damping_ratio: f64,
    /// Recurrence period (years)
    pub recurrence_period: f64,
}

impl CaseParameters {
    pub fn new(direction: f64, damping_ratio: f64, recurrence_period: f64) -> Self {
        Self {
            direction,
            damping_ratio,
            recurrence_period,
        }
    }

    pub fn value(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Direction => self.direction,
            Parameter::DampingRatio => self.damping_ratio,
            Parameter::RecurrencePeriod => self.recurrence_period,
        }
    }

    /// Deterministic file stem; two processes computing the same case agree on it.
    pub fn key(&self) -> String {
        format!(
            "hfpi_dir{:.2}_xi{:.4}_rp{:.2}",
            self.direction, self.damping_ratio, self.recurrence_period
        )
    }

    pub fn file_name(&self) -> String {
        format!("{}.bin", self.key())
    }
}

impl fmt::Display for CaseParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "direction={} xi={} rp={}",
            format_direction(self.direction),
            self.damping_ratio,
            self.recurrence_period
        )
    }
}

/// Directory label of a wind direction: `90` rather than `90.0`.
pub fn format_direction(direction: f64) -> String {
    if direction.fract() == 0.0 && direction.abs() < 1e9 {
        format!("{}", direction as i64)
    } else {
        format!("{direction}")
    }
}

/// Combined modal response of one case, every matrix shaped samples × floors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub displacement: Axes<DMatrix<f64>>,
    pub static_equivalent_force: Axes<DMatrix<f64>>,
}

impl CaseResult {
    pub fn new(
        displacement: Axes<DMatrix<f64>>,
        static_equivalent_force: Axes<DMatrix<f64>>,
    ) -> Result<Self> {
        let result = Self {
            displacement,
            static_equivalent_force,
        };
        result.validate()?;
        Ok(result)
    }

    /// All six matrices must share one shape.
    pub fn validate(&self) -> Result<()> {
        let expected = self.displacement.x.shape();
        let all = self
            .displacement
            .iter()
            .chain(self.static_equivalent_force.iter());
        for (axis, m) in all {
            if m.shape() != expected {
                return Err(ModelError::ShapeMismatch(format!(
                    "{} axis is {:?}, expected {:?}",
                    axis.as_str(),
                    m.shape(),
                    expected
                )));
            }
        }
        Ok(())
    }

    pub fn num_samples(&self) -> usize {
        self.displacement.x.nrows()
    }

    pub fn num_floors(&self) -> usize {
        self.displacement.x.ncols()
    }

    /// Static-equivalent base shear and torsion per sample.
    pub fn base_shear(&self) -> Axes<DVector<f64>> {
        self.static_equivalent_force.view().map(|m| m.column_sum())
    }

    /// Static-equivalent overturning moments (Σ −Fy·Z, Σ Fx·Z) and torsion.
    pub fn base_moment(&self, floors: &[Floor]) -> Result<Axes<DVector<f64>>> {
        if floors.len() != self.num_floors() {
            return Err(ModelError::ShapeMismatch(format!(
                "{} floors for a result with {} floors",
                floors.len(),
                self.num_floors()
            )));
        }
        let heights = DVector::from_iterator(floors.len(), floors.iter().map(|f| f.height));
        let sef = &self.static_equivalent_force;
        Ok(Axes {
            x: -(&sef.y * &heights),
            y: &sef.x * &heights,
            z: sef.z.column_sum(),
        })
    }
}
