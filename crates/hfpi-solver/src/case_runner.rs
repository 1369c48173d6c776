//! Per-case pipeline: inputs for one `(direction, ξ, recurrence period)`
//! triple in, [`CaseResult`] out.

use std::path::PathBuf;

use hfpi_model::{
    CaseParameters, CaseResult, DEFAULT_AIR_DENSITY, DimensionalParameters, ForcesData,
    StructuralModel, format_direction,
};
use hfpi_tables::Table;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::integrator::IntegratorKind;
use crate::response_solver::ResponseSolver;

/// Force file names inside one direction directory.
pub const FORCE_FILES: [&str; 3] = ["Fx.csv", "Fy.csv", "Mz.csv"];

/// Computes one analysis case. Implementations must be callable from
/// several worker threads at once.
pub trait CaseRunner: Sync {
    fn run(&self, params: &CaseParameters) -> Result<CaseResult>;
}

/// Non-dimensional force histories per wind direction.
pub trait ForcesSource: Send + Sync {
    fn load(&self, direction: f64) -> Result<ForcesData>;
}

/// Reference velocity at building height for a recurrence period.
pub trait ReferenceVelocity: Send + Sync {
    fn u_h(&self, recurrence_period: f64) -> Result<f64>;
}

/// Reads `<root>/<direction>/{Fx,Fy,Mz}.csv`.
#[derive(Debug, Clone)]
pub struct CsvForcesSource {
    root: PathBuf,
}

impl CsvForcesSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn directory(&self, direction: f64) -> PathBuf {
        self.root.join(format_direction(direction))
    }
}

impl ForcesSource for CsvForcesSource {
    fn load(&self, direction: f64) -> Result<ForcesData> {
        let dir = self.directory(direction);
        if !dir.is_dir() {
            return Err(SolverError::MissingForces(direction));
        }
        let read = |name: &str| Table::parse_file(dir.join(name));
        let [fx, fy, mz] = FORCE_FILES;
        let forces = ForcesData::from_tables(&read(fx)?, &read(fy)?, &read(mz)?)?;
        debug!(
            "loaded {} force samples for direction {} from {}",
            forces.num_samples(),
            format_direction(direction),
            dir.display()
        );
        Ok(forces)
    }
}

/// Forces held in memory, keyed by direction.
#[derive(Debug, Clone, Default)]
pub struct InMemoryForces {
    entries: Vec<(f64, ForcesData)>,
}

impl InMemoryForces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, direction: f64, forces: ForcesData) -> Self {
        self.entries.retain(|(d, _)| *d != direction);
        self.entries.push((direction, forces));
        self
    }
}

impl ForcesSource for InMemoryForces {
    fn load(&self, direction: f64) -> Result<ForcesData> {
        self.entries
            .iter()
            .find(|(d, _)| *d == direction)
            .map(|(_, forces)| forces.clone())
            .ok_or(SolverError::MissingForces(direction))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityEntry {
    /// Years
    pub recurrence_period: f64,
    /// m/s
    pub u_h: f64,
}

/// Lookup table of U_H per recurrence period; periods must match exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VelocityTable(pub Vec<VelocityEntry>);

impl ReferenceVelocity for VelocityTable {
    fn u_h(&self, recurrence_period: f64) -> Result<f64> {
        self.0
            .iter()
            .find(|e| e.recurrence_period == recurrence_period)
            .map(|e| e.u_h)
            .ok_or(SolverError::MissingVelocity(recurrence_period))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingDimensions {
    /// H (m)
    pub height: f64,
    /// B (m)
    pub base: f64,
    #[serde(default = "default_air_density")]
    pub air_density: f64,
}

fn default_air_density() -> f64 {
    DEFAULT_AIR_DENSITY
}

impl BuildingDimensions {
    pub fn new(height: f64, base: f64) -> Self {
        Self {
            height,
            base,
            air_density: DEFAULT_AIR_DENSITY,
        }
    }
}

/// Loads forces, scales them for the case, and solves the modal response.
pub struct HfpiCaseRunner<F = CsvForcesSource, V = VelocityTable> {
    structure: StructuralModel,
    forces: F,
    velocity: V,
    building: BuildingDimensions,
    integrator: IntegratorKind,
}

impl<F: ForcesSource, V: ReferenceVelocity> HfpiCaseRunner<F, V> {
    pub fn new(
        structure: StructuralModel,
        forces: F,
        velocity: V,
        building: BuildingDimensions,
        integrator: IntegratorKind,
    ) -> Self {
        Self {
            structure,
            forces,
            velocity,
            building,
            integrator,
        }
    }

    pub fn structure(&self) -> &StructuralModel {
        &self.structure
    }

    pub fn integrator(&self) -> IntegratorKind {
        self.integrator
    }

    pub fn dimensional_parameters(&self, params: &CaseParameters) -> Result<DimensionalParameters> {
        let u_h = self.velocity.u_h(params.recurrence_period)?;
        let dims = DimensionalParameters::new(u_h, self.building.height, self.building.base)?
            .with_air_density(self.building.air_density)?
            .with_damping_ratio(params.damping_ratio)?;
        Ok(dims)
    }

    /// Physical force histories of the case.
    pub fn scaled_forces(&self, params: &CaseParameters) -> Result<ForcesData> {
        let dims = self.dimensional_parameters(params)?;
        Ok(self.forces.load(params.direction)?.scale(&dims)?)
    }
}

impl<F: ForcesSource, V: ReferenceVelocity> CaseRunner for HfpiCaseRunner<F, V> {
    fn run(&self, params: &CaseParameters) -> Result<CaseResult> {
        let dims = self.dimensional_parameters(params)?;
        let raw = self.forces.load(params.direction)?;
        let solver = ResponseSolver::from_unscaled(&self.structure, &raw, &dims)?;
        solver.solve(&self.integrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfpi_model::{Floor, ForceTable, ModalShape, Mode};
    use nalgebra::DMatrix;
    use std::fs;

    fn structure() -> StructuralModel {
        let floors = vec![Floor {
            height: 10.0,
            center_of_rotation: (0.0, 0.0),
            mass: 1.0,
            moment_of_inertia: 1.0,
            radius_of_gyration: 1.0,
        }];
        let shapes = vec![ModalShape::new(vec![1.0], vec![0.0], vec![0.0]).unwrap()];
        StructuralModel::new(vec![Mode::new(1, 4.0).unwrap()], floors, shapes, 1).unwrap()
    }

    fn raw(n: usize) -> ForcesData {
        let time = (0..n).map(|i| i as f64 * 0.01).collect();
        let t = || ForceTable::new(vec![0], DMatrix::from_element(n, 1, 0.5)).unwrap();
        ForcesData::new(time, t(), t(), t()).unwrap()
    }

    fn runner() -> HfpiCaseRunner<InMemoryForces, VelocityTable> {
        HfpiCaseRunner::new(
            structure(),
            InMemoryForces::new().with(0.0, raw(50)),
            VelocityTable(vec![VelocityEntry {
                recurrence_period: 50.0,
                u_h: 20.0,
            }]),
            BuildingDimensions::new(10.0, 5.0),
            IntegratorKind::Recurrence,
        )
    }

    #[test]
    fn case_parameters_reach_dimensional_parameters() {
        let dims = runner()
            .dimensional_parameters(&CaseParameters::new(0.0, 0.03, 50.0))
            .unwrap();
        assert_eq!(dims.u_h, 20.0);
        assert_eq!(dims.damping_ratio, 0.03);
        assert_eq!(dims.time_scale(), 0.5);
    }

    #[test]
    fn runs_a_case() {
        let result = runner().run(&CaseParameters::new(0.0, 0.02, 50.0)).unwrap();
        assert_eq!(result.num_samples(), 50);
        assert_eq!(result.num_floors(), 1);
    }

    #[test]
    fn unknown_direction_or_period_fails() {
        let r = runner();
        assert!(matches!(
            r.run(&CaseParameters::new(45.0, 0.02, 50.0)),
            Err(SolverError::MissingForces(_))
        ));
        assert!(matches!(
            r.run(&CaseParameters::new(0.0, 0.02, 10.0)),
            Err(SolverError::MissingVelocity(_))
        ));
    }

    #[test]
    fn csv_source_reads_direction_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("90");
        fs::create_dir_all(&sub).unwrap();
        for name in FORCE_FILES {
            fs::write(sub.join(name), "time_normalized,0\n0.0,1.0\n0.1,2.0\n").unwrap();
        }

        let source = CsvForcesSource::new(dir.path());
        let forces = source.load(90.0).unwrap();
        assert_eq!(forces.num_samples(), 2);
        assert!(!forces.is_scaled());
        assert!(matches!(source.load(0.0), Err(SolverError::MissingForces(_))));
    }
}
