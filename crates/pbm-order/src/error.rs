use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("source directory not found: {0}")]
    SourceDirNotFound(PathBuf),

    #[error("failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<walkdir::Error> for OrderError {
    fn from(e: walkdir::Error) -> Self {
        let path = e.path().map(PathBuf::from).unwrap_or_default();
        match e.into_io_error() {
            Some(io) => Self::Io(io),
            None => Self::Walk {
                path,
                message: "filesystem loop detected".into(),
            },
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
