use std::path::PathBuf;
use std::time::Duration;

/// Errors reported by the compiler service and the helpers around it.
#[derive(Debug, thiserror::Error)]
pub enum OrcaError {
    /// The object's source did not compile. Expected while dependencies are
    /// still missing; retried on the next iteration.
    #[error("Compilation failed for {object}: {message}")]
    CompilationFailed { object: String, message: String },

    /// The connection to the service is unusable.
    #[error("connection error: {0}")]
    Connection(String),

    /// A service call did not answer in time.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The requested object does not exist in the container.
    #[error("object {object} not found in {container}")]
    ObjectNotFound { container: String, object: String },

    /// A source file is not valid UTF-8 (after BOM/UTF-16 handling).
    #[error("invalid source encoding in {path}: {reason}")]
    InvalidEncoding { path: PathBuf, reason: String },

    /// A named resource blob is not available.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrcaError {
    /// Connection-level failure: the session must not be used any further.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }

    /// Expected compile failure that counts toward convergence.
    pub fn is_compile_failure(&self) -> bool {
        matches!(self, Self::CompilationFailed { .. })
    }
}

pub type OrcaResult<T> = Result<T, OrcaError>;
