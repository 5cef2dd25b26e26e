use thiserror::Error;

#[derive(Debug, Error)]
pub enum BinsecError {
    #[error("sidecar contains no data blocks")]
    NoBlocks,

    #[error("missing block marker at offset {offset}: expected DAT*, found {found}")]
    MissingMarker { offset: usize, found: String },

    #[error("block at offset {offset} declares {declared} payload bytes (maximum 502)")]
    BlockTooLong { offset: usize, declared: usize },

    #[error("block at offset {offset} is truncated: {reason}")]
    Truncated { offset: usize, reason: String },

    #[error("payload group remainder of {0} bytes (must be 0 or 2)")]
    BadRemainder(usize),

    #[error("invalid hex payload: {0}")]
    InvalidHex(String),

    #[error("malformed binary section: {0}")]
    MalformedSection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BinsecError {
    /// Returns `true` when the input itself is corrupt, as opposed to an I/O
    /// failure while reading it. Structural errors are never fixed by retrying.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

pub type BinsecResult<T> = Result<T, BinsecError>;
