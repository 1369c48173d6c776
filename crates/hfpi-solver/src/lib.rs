//! HFPI modal dynamic response solver.
//!
//! Turns floor force histories measured on a rigid building model into the
//! dynamic response of the real structure, one single-degree-of-freedom
//! oscillator per mode:
//!
//! - [`projector`]: generalized force of each active mode
//! - [`integrator`]: `x'' + 2ξωx' + ω²x = F(t)` by recurrence or adaptive Runge–Kutta
//! - [`expansion`]: floor displacements, static-equivalent forces, modal superposition
//! - [`response_solver`]: the per-case pipeline over one set of forces
//! - [`sweep`]: directions × damping ratios × recurrence periods on a bounded pool
//! - [`aggregate`]: grouping and extremes over completed cases

pub mod aggregate;
pub mod case_runner;
pub mod config;
pub mod error;
pub mod expansion;
pub mod integrator;
pub mod projector;
pub mod response_solver;
pub mod sweep;

pub use aggregate::{
    CaseGroup, LoadedCase, Signal, applied_extremes, directional_table, extremes, group_by,
    load_completed, pooled_extremes,
};
pub use case_runner::{
    BuildingDimensions, CaseRunner, CsvForcesSource, FORCE_FILES, ForcesSource, HfpiCaseRunner,
    InMemoryForces, ReferenceVelocity, VelocityEntry, VelocityTable,
};
pub use config::{REPORT_FILE, SweepConfig};
pub use error::{Result, SolverError, SweepError};
pub use expansion::{ModalResponse, combine_modes, real_displacement, static_equivalent_force};
pub use integrator::{IntegratorKind, ModalIntegrator, Recurrence, RungeKutta};
pub use projector::{project_forces, project_onto_shape};
pub use response_solver::ResponseSolver;
pub use sweep::{
    CaseOutcome, CasePool, FailurePolicy, MAX_WORKERS, Sweep, SweepPlan, SweepReport,
};
