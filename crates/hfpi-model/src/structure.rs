//! Structural description of a building for modal analysis.
//!
//! A [`StructuralModel`] owns three aligned collections:
//! - the vibration [`Mode`]s, ordered by id
//! - the [`Floor`]s, ordered by height
//! - one [`ModalShape`] per mode, row-aligned with the floors
//!
//! Only the lowest `n_modes` modes take part in the response; the remaining
//! shapes are kept so that the model can be re-used with a larger cap.

use std::f64::consts::PI;

use hfpi_tables::Table;
use log::debug;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

pub const MODE_COLUMNS: &[&str] = &["mode", "period"];
pub const FLOOR_COLUMNS: &[&str] = &["Z", "XR", "YR", "M", "I", "R"];
pub const SHAPE_COLUMNS: &[&str] = &["DX", "DY", "RZ"];

/// A natural vibration mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mode {
    pub id: usize,
    /// Natural period in seconds
    pub period: f64,
}

impl Mode {
    pub fn new(id: usize, period: f64) -> Result<Self> {
        if !period.is_finite() || period <= 0.0 {
            return Err(ModelError::InvalidInput(format!(
                "mode {id}: period must be positive, got {period}"
            )));
        }
        Ok(Self { id, period })
    }

    /// Natural frequency (Hz)
    pub fn frequency(&self) -> f64 {
        1.0 / self.period
    }

    /// Angular frequency ωp (rad/s)
    pub fn angular_frequency(&self) -> f64 {
        2.0 * PI * self.frequency()
    }

    /// Reads a `mode, period` table. Rows are returned sorted by id.
    pub fn from_table(table: &Table) -> Result<Vec<Self>> {
        table.require(MODE_COLUMNS)?;
        let ids = table.column("mode")?;
        let periods = table.column("period")?;

        let mut modes = ids
            .iter()
            .zip(periods)
            .map(|(&id, &period)| Self::new(as_index(id, "mode")?, period))
            .collect::<Result<Vec<_>>>()?;
        modes.sort_by_key(|m| m.id);
        Ok(modes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    /// Elevation Z (m)
    pub height: f64,
    /// Center of rotation (XR, YR)
    pub center_of_rotation: (f64, f64),
    /// Lumped mass M (kg)
    pub mass: f64,
    /// Polar moment of inertia I (kg·m²)
    pub moment_of_inertia: f64,
    /// Radius of gyration R (m)
    pub radius_of_gyration: f64,
}

impl Floor {
    /// Reads a `Z, XR, YR, M, I, R` table in file order.
    pub fn from_table(table: &Table) -> Result<Vec<Self>> {
        table.require(FLOOR_COLUMNS)?;
        let z = table.column("Z")?;
        let xr = table.column("XR")?;
        let yr = table.column("YR")?;
        let m = table.column("M")?;
        let i = table.column("I")?;
        let r = table.column("R")?;

        Ok((0..table.num_rows())
            .map(|row| Self {
                height: z[row],
                center_of_rotation: (xr[row], yr[row]),
                mass: m[row],
                moment_of_inertia: i[row],
                radius_of_gyration: r[row],
            })
            .collect())
    }
}

/// Floor-wise components of one mode shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalShape {
    pub dx: DVector<f64>,
    pub dy: DVector<f64>,
    pub rz: DVector<f64>,
}

impl ModalShape {
    pub fn new(dx: Vec<f64>, dy: Vec<f64>, rz: Vec<f64>) -> Result<Self> {
        if dx.len() != dy.len() || dx.len() != rz.len() {
            return Err(ModelError::InvalidInput(format!(
                "shape components differ in length: DX={}, DY={}, RZ={}",
                dx.len(),
                dy.len(),
                rz.len()
            )));
        }
        Ok(Self {
            dx: DVector::from_vec(dx),
            dy: DVector::from_vec(dy),
            rz: DVector::from_vec(rz),
        })
    }

    pub fn from_table(table: &Table) -> Result<Self> {
        table.require(SHAPE_COLUMNS)?;
        Self::new(
            table.column("DX")?.to_vec(),
            table.column("DY")?.to_vec(),
            table.column("RZ")?.to_vec(),
        )
    }

    pub fn num_floors(&self) -> usize {
        self.dx.len()
    }

    /// Σ M·(DX² + DY² + (R·RZ)²)
    pub fn generalized_mass(&self, floors: &[Floor]) -> f64 {
        floors
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let rot = f.radius_of_gyration * self.rz[i];
                f.mass * (self.dx[i].powi(2) + self.dy[i].powi(2) + rot.powi(2))
            })
            .sum()
    }

    fn reordered(&self, order: &[usize]) -> Self {
        let pick = |v: &DVector<f64>| DVector::from_iterator(order.len(), order.iter().map(|&i| v[i]));
        Self {
            dx: pick(&self.dx),
            dy: pick(&self.dy),
            rz: pick(&self.rz),
        }
    }

    fn scale(&mut self, factor: f64) {
        self.dx *= factor;
        self.dy *= factor;
        self.rz *= factor;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuralModel {
    modes: Vec<Mode>,
    floors: Vec<Floor>,
    shapes: Vec<ModalShape>,
    n_modes: usize,
    normalized: bool,
}

impl StructuralModel {
    /// Builds a model from modes, floors and shapes.
    ///
    /// `shapes[i]` belongs to the i-th mode in ascending id order and is
    /// row-aligned with `floors` as given. Floors are re-sorted by height and
    /// shape rows follow the same permutation.
    ///
    /// # Errors
    /// - more shapes than modes, or fewer shapes than active modes
    /// - a shape whose row count differs from the floor count
    pub fn new(
        mut modes: Vec<Mode>,
        floors: Vec<Floor>,
        shapes: Vec<ModalShape>,
        active_cap: usize,
    ) -> Result<Self> {
        modes.sort_by_key(|m| m.id);
        if shapes.len() > modes.len() {
            return Err(ModelError::TooManyShapes {
                shapes: shapes.len(),
                modes: modes.len(),
            });
        }

        let n_modes = active_cap.min(modes.len());
        if shapes.len() < n_modes {
            return Err(ModelError::MissingShapes {
                active: n_modes,
                shapes: shapes.len(),
            });
        }

        for (mode, shape) in modes.iter().zip(&shapes) {
            if shape.num_floors() != floors.len() {
                return Err(ModelError::ShapeRowMismatch {
                    mode: mode.id,
                    rows: shape.num_floors(),
                    floors: floors.len(),
                });
            }
        }

        let mut order: Vec<usize> = (0..floors.len()).collect();
        order.sort_by(|&a, &b| floors[a].height.total_cmp(&floors[b].height));
        let sorted_floors = order.iter().map(|&i| floors[i]).collect();
        let sorted_shapes = shapes.iter().map(|s| s.reordered(&order)).collect();

        Ok(Self {
            modes,
            floors: sorted_floors,
            shapes: sorted_shapes,
            n_modes,
            normalized: false,
        })
    }

    pub fn from_tables(
        modes: &Table,
        floors: &Table,
        shapes: &[Table],
        active_cap: usize,
    ) -> Result<Self> {
        let modes = Mode::from_table(modes)?;
        let floors = Floor::from_table(floors)?;
        let shapes = shapes
            .iter()
            .map(ModalShape::from_table)
            .collect::<Result<Vec<_>>>()?;
        Self::new(modes, floors, shapes, active_cap)
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn floors(&self) -> &[Floor] {
        &self.floors
    }

    pub fn shapes(&self) -> &[ModalShape] {
        &self.shapes
    }

    pub fn n_modes(&self) -> usize {
        self.n_modes
    }

    pub fn num_floors(&self) -> usize {
        self.floors.len()
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// The modes taking part in the response, paired with their shapes.
    pub fn active_modes(&self) -> impl Iterator<Item = (&Mode, &ModalShape)> {
        self.modes.iter().zip(&self.shapes).take(self.n_modes)
    }

    pub fn generalized_mass(&self, mode_index: usize) -> Option<f64> {
        self.shapes
            .get(mode_index)
            .map(|s| s.generalized_mass(&self.floors))
    }

    /// Rescales every shape to unit generalized mass.
    ///
    /// Runs once; later calls return immediately without touching the shapes.
    /// On error no shape is modified.
    pub fn normalize(&mut self) -> Result<()> {
        if self.normalized {
            return Ok(());
        }

        let factors = self
            .modes
            .iter()
            .zip(&self.shapes)
            .map(|(mode, shape)| {
                let mass = shape.generalized_mass(&self.floors);
                if mass.is_finite() && mass > 0.0 {
                    Ok(1.0 / mass.sqrt())
                } else {
                    Err(ModelError::DegenerateShape {
                        mode: mode.id,
                        mass,
                    })
                }
            })
            .collect::<Result<Vec<_>>>()?;

        for (shape, factor) in self.shapes.iter_mut().zip(factors) {
            shape.scale(factor);
        }
        self.normalized = true;
        debug!("normalized {} modal shapes", self.shapes.len());
        Ok(())
    }
}

fn as_index(value: f64, column: &str) -> Result<usize> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Ok(value as usize)
    } else {
        Err(ModelError::InvalidInput(format!(
            "column {column}: {value} is not a valid index"
        )))
    }
}
