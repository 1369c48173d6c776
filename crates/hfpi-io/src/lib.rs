//! I/O support for HFPI sweeps.
//!
//! This crate provides:
//! - **Case result files**: versioned bincode payloads published by atomic rename
//! - **Result store**: one file per analysis-case key under a sweep directory
//! - **Sweep manifest**: JSON record of every case's final state
//! - **Directional report**: CSV table of per-direction force and moment extremes

pub mod error;
mod manifest;
mod report;
mod result_file;

pub use error::{Result, StoreError};
pub use manifest::{
    CaseState, MANIFEST_FILE, ManifestEntry, SweepManifest, load_manifest, write_manifest,
};
pub use report::{DirectionalRow, Extremes, report_headers, write_directional_report};
pub use result_file::{RESULT_EXTENSION, ResultStore, load_case_result, save_case_result};
