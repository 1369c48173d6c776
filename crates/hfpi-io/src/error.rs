//! Error types for hfpi-io

use std::io;
use std::path::PathBuf;

use hfpi_model::ModelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: not a case result file", .path.display())]
    BadHeader { path: PathBuf },

    #[error("{}: unsupported format version {found}", .path.display())]
    UnsupportedVersion { path: PathBuf, found: u32 },

    #[error("{}: corrupt payload: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, err: ModelError) -> Self {
        StoreError::Corrupt {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Underlying I/O error kind, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            StoreError::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}
