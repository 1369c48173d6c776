//! Per-case status of a sweep, written next to the results as JSON.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use hfpi_model::CaseParameters;
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::error::{Result, StoreError};

pub const MANIFEST_FILE: &str = "sweep_manifest.json";

/// Lifecycle of one analysis case: `Pending → Running → Completed | Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum CaseState {
    Pending,
    Running,
    Completed,
    Failed(String),
}

impl CaseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseState::Pending => "PENDING",
            CaseState::Running => "RUNNING",
            CaseState::Completed => "COMPLETED",
            CaseState::Failed(_) => "FAILED",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, CaseState::Completed | CaseState::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub key: String,
    pub parameters: CaseParameters,
    pub state: CaseState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepManifest {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cases: Vec<ManifestEntry>,
}

impl SweepManifest {
    pub fn count(&self, state: &str) -> usize {
        self.cases.iter().filter(|c| c.state.as_str() == state).count()
    }
}

pub fn write_manifest(dir: impl AsRef<Path>, manifest: &SweepManifest) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|err| StoreError::io(dir, err))?;
    let path = dir.join(MANIFEST_FILE);

    let bytes = serde_json::to_vec_pretty(manifest)?;
    let mut tmp = Builder::new()
        .prefix(".manifest-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|err| StoreError::io(dir, err))?;
    tmp.write_all(&bytes)
        .map_err(|err| StoreError::io(tmp.path(), err))?;
    tmp.persist(&path)
        .map_err(|err| StoreError::io(&path, err.error))?;
    Ok(())
}

pub fn load_manifest(dir: impl AsRef<Path>) -> Result<SweepManifest> {
    let path = dir.as_ref().join(MANIFEST_FILE);
    let bytes = fs::read(&path).map_err(|err| StoreError::io(&path, err))?;
    Ok(serde_json::from_slice(&bytes)?)
}
