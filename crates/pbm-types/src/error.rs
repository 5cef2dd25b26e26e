use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object name: {0:?}")]
    InvalidObjectName(String),

    #[error("path has no file name: {0}")]
    NoFileName(String),

    #[error("unknown source kind: {0}")]
    UnknownKind(String),
}
