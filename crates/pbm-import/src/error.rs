use thiserror::Error;

use crate::report::ErrorReport;

/// Run-level failures. Per-object failures are recorded in the
/// [`ErrorReport`] instead and only surface here when the run gives up.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid import plan: {0}")]
    InvalidPlan(String),

    #[error("worker {worker} lost its connection while importing {object} and no other worker is left: {message}")]
    ConnectionExhausted {
        worker: usize,
        object: String,
        message: String,
    },

    #[error("{errors} errors remain after {iteration} iterations; further retries did not reduce them")]
    NotConverged {
        iteration: usize,
        errors: usize,
        report: ErrorReport,
    },

    #[error("{errors} errors remain after reaching the iteration cap of {iteration}")]
    IterationCap {
        iteration: usize,
        errors: usize,
        report: ErrorReport,
    },

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    /// Remaining per-object errors, for convergence failures.
    pub fn report(&self) -> Option<&ErrorReport> {
        match self {
            Self::NotConverged { report, .. } | Self::IterationCap { report, .. } => Some(report),
            _ => None,
        }
    }
}

pub type ImportResult<T> = Result<T, ImportError>;
