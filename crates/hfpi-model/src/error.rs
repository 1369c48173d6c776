//! Error types for hfpi-model

use hfpi_tables::TableError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("modal shape of mode {mode} has {rows} rows, expected {floors} (one per floor)")]
    ShapeRowMismatch {
        mode: usize,
        rows: usize,
        floors: usize,
    },

    #[error("{shapes} modal shapes supplied for only {modes} modes")]
    TooManyShapes { shapes: usize, modes: usize },

    #[error("{active} active modes require a modal shape each, only {shapes} supplied")]
    MissingShapes { active: usize, shapes: usize },

    #[error("mode {mode} has non-positive generalized mass {mass}, cannot normalize")]
    DegenerateShape { mode: usize, mass: f64 },

    #[error("force tables are not time-aligned: {0}")]
    Misaligned(String),

    #[error("forces are already scaled to physical units")]
    AlreadyScaled,

    #[error("forces are still non-dimensional, scale them first")]
    NotScaled,

    #[error("force column references floor {floor}, model has {floors} floors")]
    UnknownFloor { floor: usize, floors: usize },

    #[error("result matrices disagree in shape: {0}")]
    ShapeMismatch(String),
}
