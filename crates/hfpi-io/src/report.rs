//! Directional extremes table.
//!
//! One row per wind direction; for every signal and axis the min, mean and
//! max are written as `<signal>_<axis>_<stat>` columns.

use std::fs;
use std::path::Path;

use hfpi_model::{Axes, format_direction};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extremes {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

impl Extremes {
    /// `None` for an empty series.
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        (count > 0).then(|| Self {
            min,
            mean: sum / count as f64,
            max,
        })
    }

    /// Combines extremes of two disjoint series of `n_self` and `n_other` samples.
    pub fn merge(self, n_self: usize, other: Self, n_other: usize) -> Self {
        let total = (n_self + n_other) as f64;
        Self {
            min: self.min.min(other.min),
            mean: (self.mean * n_self as f64 + other.mean * n_other as f64) / total,
            max: self.max.max(other.max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalRow {
    pub direction: f64,
    /// Base shear and torsion of the applied wind forces
    pub static_force: Axes<Extremes>,
    /// Base overturning moments of the applied wind forces
    pub static_moment: Axes<Extremes>,
    /// Base shear and torsion of the static-equivalent forces
    pub equivalent_force: Axes<Extremes>,
    /// Base overturning moments of the static-equivalent forces
    pub equivalent_moment: Axes<Extremes>,
}

impl DirectionalRow {
    fn signals(&self) -> [(&'static str, &Axes<Extremes>); 4] {
        [
            ("static_force", &self.static_force),
            ("static_moment", &self.static_moment),
            ("sef_force", &self.equivalent_force),
            ("sef_moment", &self.equivalent_moment),
        ]
    }
}

pub fn report_headers() -> Vec<String> {
    let mut headers = vec!["direction".to_string()];
    for signal in ["static_force", "static_moment", "sef_force", "sef_moment"] {
        for axis in ["x", "y", "z"] {
            for stat in ["min", "mean", "max"] {
                headers.push(format!("{signal}_{axis}_{stat}"));
            }
        }
    }
    headers
}

pub fn write_directional_report(path: impl AsRef<Path>, rows: &[DirectionalRow]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(report_headers())?;
    for row in rows {
        let mut record = vec![format_direction(row.direction)];
        for (_, axes) in row.signals() {
            for (_, e) in axes.iter() {
                record.extend([e.min, e.mean, e.max].iter().map(|v| v.to_string()));
            }
        }
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .map_err(|err| StoreError::io(path, err))?;
    Ok(())
}
