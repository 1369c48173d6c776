//! Floor force histories for one wind direction.

use hfpi_tables::Table;
use nalgebra::{DMatrix, DVector, DVectorView};
use serde::{Deserialize, Serialize};

use crate::case::Axes;
use crate::dimensional::DimensionalParameters;
use crate::error::{ModelError, Result};
use crate::structure::Floor;

pub const TIME_COLUMN: &str = "time_normalized";

/// Allowed deviation of any sampling interval from the mean one, relative.
/// Covers timestamps rounded to a few decimals in the CSV.
const DT_TOLERANCE: f64 = 1e-2;

/// One force component, one column per loaded floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceTable {
    /// Floor index (into the height-sorted floor list) of each column
    pub floors: Vec<usize>,
    /// Samples × columns
    pub values: DMatrix<f64>,
}

impl ForceTable {
    pub fn new(floors: Vec<usize>, values: DMatrix<f64>) -> Result<Self> {
        if floors.len() != values.ncols() {
            return Err(ModelError::InvalidInput(format!(
                "{} floor labels for {} force columns",
                floors.len(),
                values.ncols()
            )));
        }
        let mut seen = floors.clone();
        seen.sort_unstable();
        if let Some(w) = seen.windows(2).find(|w| w[0] == w[1]) {
            return Err(ModelError::InvalidInput(format!(
                "floor {} appears twice in force table",
                w[0]
            )));
        }
        Ok(Self { floors, values })
    }

    fn from_table(table: &Table) -> Result<Self> {
        let indexed = table.indexed_columns(&[TIME_COLUMN])?;
        let floors = indexed.iter().map(|(idx, _)| *idx).collect();
        let values = DMatrix::from_fn(table.num_rows(), indexed.len(), |r, c| indexed[c].1[r]);
        Self::new(floors, values)
    }

    pub fn num_samples(&self) -> usize {
        self.values.nrows()
    }

    pub fn columns(&self) -> impl Iterator<Item = (usize, DVectorView<'_, f64>)> {
        self.floors
            .iter()
            .enumerate()
            .map(|(c, &floor)| (floor, self.values.column(c)))
    }

    /// Per-sample sum over floors.
    pub fn total(&self) -> DVector<f64> {
        self.values.column_sum()
    }

    /// Per-sample Σ value·weight(floor).
    fn weighted_total(&self, weight: impl Fn(usize) -> f64) -> DVector<f64> {
        let mut out = DVector::zeros(self.num_samples());
        for (floor, column) in self.columns() {
            out.axpy(weight(floor), &column, 1.0);
        }
        out
    }

    fn scaled(&self, factor: f64) -> Self {
        Self {
            floors: self.floors.clone(),
            values: &self.values * factor,
        }
    }
}

/// Fx, Fy and Mz histories sharing one time column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcesData {
    time: DVector<f64>,
    fx: ForceTable,
    fy: ForceTable,
    mz: ForceTable,
    is_scaled: bool,
}

impl ForcesData {
    /// Non-dimensional force data, as delivered by the CFD post-processing.
    pub fn new(time: Vec<f64>, fx: ForceTable, fy: ForceTable, mz: ForceTable) -> Result<Self> {
        for (name, table) in [("Fx", &fx), ("Fy", &fy), ("Mz", &mz)] {
            if table.num_samples() != time.len() {
                return Err(ModelError::Misaligned(format!(
                    "{name} has {} samples, time column has {}",
                    table.num_samples(),
                    time.len()
                )));
            }
        }
        Ok(Self {
            time: DVector::from_vec(time),
            fx,
            fy,
            mz,
            is_scaled: false,
        })
    }

    /// Reads the three per-axis tables. Their time columns must be identical.
    pub fn from_tables(fx: &Table, fy: &Table, mz: &Table) -> Result<Self> {
        for table in [fx, fy, mz] {
            table.require(&[TIME_COLUMN])?;
        }
        let time = fx.column(TIME_COLUMN)?;
        for other in [fy, mz] {
            if other.column(TIME_COLUMN)? != time {
                return Err(ModelError::Misaligned(format!(
                    "time column of {} differs from {}",
                    other.name, fx.name
                )));
            }
        }
        Self::new(
            time.to_vec(),
            ForceTable::from_table(fx)?,
            ForceTable::from_table(fy)?,
            ForceTable::from_table(mz)?,
        )
    }

    pub fn time(&self) -> &DVector<f64> {
        &self.time
    }

    pub fn fx(&self) -> &ForceTable {
        &self.fx
    }

    pub fn fy(&self) -> &ForceTable {
        &self.fy
    }

    pub fn mz(&self) -> &ForceTable {
        &self.mz
    }

    pub fn is_scaled(&self) -> bool {
        self.is_scaled
    }

    pub fn num_samples(&self) -> usize {
        self.time.len()
    }

    /// Converts to physical units: seconds, newtons and newton-metres.
    ///
    /// # Errors
    /// [`ModelError::AlreadyScaled`] if the data is already physical.
    pub fn scale(&self, dims: &DimensionalParameters) -> Result<Self> {
        if self.is_scaled {
            return Err(ModelError::AlreadyScaled);
        }
        Ok(Self {
            time: &self.time * dims.time_scale(),
            fx: self.fx.scaled(dims.force_factor()),
            fy: self.fy.scaled(dims.force_factor()),
            mz: self.mz.scaled(dims.moment_factor()),
            is_scaled: true,
        })
    }

    /// Uniform sampling interval of the time column.
    pub fn time_step(&self) -> Result<f64> {
        if self.time.len() < 2 {
            return Err(ModelError::InvalidInput(format!(
                "need at least two time samples, got {}",
                self.time.len()
            )));
        }
        let n = self.time.len();
        if let Some(w) = self.time.as_slice().windows(2).find(|w| !(w[1] > w[0])) {
            return Err(ModelError::InvalidInput(format!(
                "time column must strictly increase, got {} after {}",
                w[1], w[0]
            )));
        }
        let dt = (self.time[n - 1] - self.time[0]) / (n - 1) as f64;
        if let Some(w) = self
            .time
            .as_slice()
            .windows(2)
            .find(|w| ((w[1] - w[0]) - dt).abs() > DT_TOLERANCE * dt)
        {
            return Err(ModelError::InvalidInput(format!(
                "time column is not uniformly sampled: step {} against mean {dt}",
                w[1] - w[0]
            )));
        }
        Ok(dt)
    }

    /// Fails if any force column references a floor the model does not have.
    pub fn check_floors(&self, num_floors: usize) -> Result<()> {
        for table in [&self.fx, &self.fy, &self.mz] {
            if let Some(&floor) = table.floors.iter().find(|&&f| f >= num_floors) {
                return Err(ModelError::UnknownFloor {
                    floor,
                    floors: num_floors,
                });
            }
        }
        Ok(())
    }

    /// Base shear (Σ Fx, Σ Fy) and torsion (Σ Mz) per sample.
    pub fn base_forces(&self) -> Axes<DVector<f64>> {
        Axes {
            x: self.fx.total(),
            y: self.fy.total(),
            z: self.mz.total(),
        }
    }

    /// Overturning moments about the base (Σ −Fy·Z, Σ Fx·Z) and torsion.
    pub fn base_moments(&self, floors: &[Floor]) -> Result<Axes<DVector<f64>>> {
        self.check_floors(floors.len())?;
        let height = |floor: usize| floors[floor].height;
        Ok(Axes {
            x: -self.fy.weighted_total(height),
            y: self.fx.weighted_total(height),
            z: self.mz.total(),
        })
    }
}
