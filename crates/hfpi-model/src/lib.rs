//! Data model for HFPI modal response analysis.
//!
//! - [`StructuralModel`]: modes, floors and modal shapes of a building
//! - [`DimensionalParameters`]: reference velocity and building dimensions
//! - [`ForcesData`]: floor force histories for one wind direction
//! - [`CaseParameters`] / [`CaseResult`]: key and outcome of one analysis case

pub mod case;
pub mod dimensional;
pub mod error;
pub mod forces;
pub mod structure;

pub use case::{Axes, Axis, CaseParameters, CaseResult, Parameter, format_direction};
pub use dimensional::{DEFAULT_AIR_DENSITY, DEFAULT_DAMPING_RATIO, DimensionalParameters};
pub use error::{ModelError, Result};
pub use forces::{ForceTable, ForcesData, TIME_COLUMN};
pub use structure::{Floor, ModalShape, Mode, StructuralModel};
