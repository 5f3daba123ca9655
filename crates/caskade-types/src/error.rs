use thiserror::Error;

/// Errors from parsing or converting a [`ContentId`](crate::ContentId).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("content id is not valid hex: {0}")]
    InvalidHex(String),

    #[error("content id must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
