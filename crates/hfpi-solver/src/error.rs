//! Error types for hfpi-solver

use std::path::PathBuf;

use hfpi_io::StoreError;
use hfpi_model::ModelError;
use hfpi_tables::TableError;
use thiserror::Error;

use crate::sweep::SweepReport;

pub type Result<T> = std::result::Result<T, SolverError>;

/// Failure of one analysis case or of its inputs.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("angular frequency must be positive, got {0}")]
    InvalidFrequency(f64),

    #[error("time step must be positive, got {0}")]
    InvalidTimeStep(f64),

    #[error("damping ratio must be non-negative, got {0}")]
    InvalidDamping(f64),

    #[error("recurrence integration unstable: wp*dt = {0:.4} (must be < 2)")]
    Unstable(f64),

    #[error("integration diverged at sample {0}")]
    Diverged(usize),

    #[error("adaptive integration exceeded {limit} substeps in interval {interval}")]
    StepLimit { limit: usize, interval: usize },

    #[error("no modal responses to combine")]
    NoModes,

    #[error("modal responses disagree in shape: {0}")]
    ShapeMismatch(String),

    #[error("no forces available for direction {0}")]
    MissingForces(f64),

    #[error("no reference velocity for recurrence period {0}")]
    MissingVelocity(f64),

    #[error("failed to read config {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    #[error("case panicked: {0}")]
    Panicked(String),
}

/// Sweep-level failure; per-case failures are reported in the sweep report.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("failed to build worker pool: {0}")]
    Pool(String),

    #[error("case {0} appears more than once in the sweep")]
    DuplicateCase(String),

    /// Carries the full report so the manifest can still be written.
    #[error("all {} cases failed; first: {}", .report.outcomes.len(), first_failure(.report))]
    AllCasesFailed { report: Box<SweepReport> },

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn first_failure(report: &SweepReport) -> String {
    report
        .failed()
        .next()
        .map(|(params, message)| format!("{}: {message}", params.key()))
        .unwrap_or_default()
}
