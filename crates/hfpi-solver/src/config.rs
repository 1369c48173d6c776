//! JSON sweep configuration.
//!
//! Relative paths are resolved against the directory holding the config
//! file, so a sweep directory can be moved as a whole.

use std::fs;
use std::path::{Path, PathBuf};

use hfpi_io::ResultStore;
use hfpi_model::StructuralModel;
use hfpi_tables::Table;
use log::info;
use serde::{Deserialize, Serialize};

use crate::case_runner::{BuildingDimensions, CsvForcesSource, HfpiCaseRunner, VelocityTable};
use crate::error::{Result, SolverError, SweepError};
use crate::integrator::IntegratorKind;
use crate::sweep::{CasePool, FailurePolicy, SweepPlan};

pub const REPORT_FILE: &str = "directional_report.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    pub modes: PathBuf,
    pub floors: PathBuf,
    /// One shape table per mode, in mode order
    pub shapes: Vec<PathBuf>,
    /// Cap on the number of modes taking part; all modes when absent
    #[serde(default)]
    pub active_modes: Option<usize>,
    /// Scale shapes to unit generalized mass before solving
    #[serde(default = "default_true")]
    pub normalize_shapes: bool,
    /// Holds `<direction>/{Fx,Fy,Mz}.csv`
    pub forces_dir: PathBuf,
    pub output_dir: PathBuf,
    pub building: BuildingDimensions,
    pub directions: Vec<f64>,
    pub damping_ratios: Vec<f64>,
    pub recurrence_periods: Vec<f64>,
    pub reference_velocity: VelocityTable,
    #[serde(default)]
    pub integrator: IntegratorKind,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub stop_on_failure: bool,
}

fn default_true() -> bool {
    true
}

impl SweepConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_error = |reason: String| SolverError::Config {
            path: path.to_path_buf(),
            reason,
        };
        let raw = fs::read_to_string(path).map_err(|err| config_error(err.to_string()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&raw, base).map_err(|err| match err {
            SolverError::Config { reason, .. } => config_error(reason),
            other => other,
        })
    }

    /// Parses `raw` and resolves relative paths against `base`.
    pub fn parse(raw: &str, base: &Path) -> Result<Self> {
        let mut config: Self = serde_json::from_str(raw).map_err(|err| SolverError::Config {
            path: base.to_path_buf(),
            reason: err.to_string(),
        })?;
        config.resolve_paths(base);
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let paths = [
            &mut self.modes,
            &mut self.floors,
            &mut self.forces_dir,
            &mut self.output_dir,
        ];
        for p in paths.into_iter().chain(self.shapes.iter_mut()) {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
    }

    /// Reads the modes, floors and shape tables into a model.
    pub fn load_structure(&self) -> Result<StructuralModel> {
        let modes = Table::parse_file(&self.modes)?;
        let floors = Table::parse_file(&self.floors)?;
        let shapes = self
            .shapes
            .iter()
            .map(Table::parse_file)
            .collect::<hfpi_tables::Result<Vec<_>>>()?;
        let cap = self.active_modes.unwrap_or(usize::MAX);

        let mut structure = StructuralModel::from_tables(&modes, &floors, &shapes, cap)?;
        if self.normalize_shapes {
            structure.normalize()?;
        }
        info!(
            "structure: {} modes ({} active), {} floors",
            structure.modes().len(),
            structure.n_modes(),
            structure.num_floors()
        );
        Ok(structure)
    }

    pub fn plan(&self) -> std::result::Result<SweepPlan, SweepError> {
        SweepPlan::new(&self.directions, &self.damping_ratios, &self.recurrence_periods)
    }

    pub fn runner(&self) -> Result<HfpiCaseRunner> {
        Ok(HfpiCaseRunner::new(
            self.load_structure()?,
            CsvForcesSource::new(&self.forces_dir),
            self.reference_velocity.clone(),
            self.building,
            self.integrator,
        ))
    }

    pub fn pool(&self) -> std::result::Result<CasePool, SweepError> {
        CasePool::new(self.workers.unwrap_or_else(CasePool::default_size))
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        if self.stop_on_failure {
            FailurePolicy::StopDispatch
        } else {
            FailurePolicy::Continue
        }
    }

    pub fn store(&self) -> Result<ResultStore> {
        Ok(ResultStore::open(&self.output_dir)?)
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = r#"{
        "modes": "modes.csv",
        "floors": "floors.csv",
        "shapes": ["mode1.csv", "/abs/mode2.csv"],
        "forces_dir": "forces",
        "output_dir": "results",
        "building": {"height": 120.0, "base": 30.0},
        "directions": [0, 90],
        "damping_ratios": [0.01, 0.02],
        "recurrence_periods": [50, 100],
        "reference_velocity": [
            {"recurrence_period": 50, "u_h": 38.0},
            {"recurrence_period": 100, "u_h": 41.5}
        ]
    }"#;

    #[test]
    fn applies_defaults() {
        let config = SweepConfig::parse(RAW, Path::new("/sweep")).unwrap();
        assert_eq!(config.integrator, IntegratorKind::RungeKutta);
        assert_eq!(config.active_modes, None);
        assert!(config.normalize_shapes);
        assert_eq!(config.failure_policy(), FailurePolicy::Continue);
        assert_eq!(config.building.air_density, hfpi_model::DEFAULT_AIR_DENSITY);
        assert_eq!(config.plan().unwrap().len(), 8);
    }

    #[test]
    fn resolves_relative_paths_only() {
        let config = SweepConfig::parse(RAW, Path::new("/sweep")).unwrap();
        assert_eq!(config.modes, PathBuf::from("/sweep/modes.csv"));
        assert_eq!(config.shapes[0], PathBuf::from("/sweep/mode1.csv"));
        assert_eq!(config.shapes[1], PathBuf::from("/abs/mode2.csv"));
        assert_eq!(config.report_path(), PathBuf::from("/sweep/results/directional_report.csv"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let raw = RAW.replacen("\"modes\"", "\"mode_table\": 1, \"modes\"", 1);
        let err = SweepConfig::parse(&raw, Path::new("/sweep")).unwrap_err();
        assert!(matches!(err, SolverError::Config { .. }));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = SweepConfig::from_file("/nonexistent/sweep.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/sweep.json"));
    }
}
