//! Multi-container import scheduler for pbmanager.
//!
//! Imports exported object sources into their library containers through the
//! compiler service. References between objects, including cycles across
//! containers, are resolved by repeating the import until no object fails
//! or repeating stops helping.
//!
//! # Key Types
//!
//! - [`MultiImport`]: the fixed-point retry loop
//! - [`ImportConfig`] / [`ImportPlan`]: tunables and TOML run descriptions
//! - [`ImportReport`] / [`ErrorReport`]: per-iteration results and the
//!   remaining errors of a failed run
//! - [`ImportError`]: run-level failures

pub mod config;
pub mod error;
mod pool;
pub mod report;
pub mod state;
pub mod scheduler;

pub use config::{ImportConfig, ImportPlan, StagnationReset};
pub use error::{ImportError, ImportResult};
pub use report::{ErrorKind, ErrorReport, ImportReport, IterationReport, ObjectError};
pub use scheduler::MultiImport;
