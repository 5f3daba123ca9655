use std::io;
use std::path::PathBuf;

use caskade_registry::{RegistrationError, ShapeError};

use crate::record::RecordPosition;

/// Errors produced by the log engine.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// I/O error while reading or appending.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record could not be serialized for appending.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored record failed framing, checksum, or payload validation.
    #[error("corrupt record at position {position}: {reason}")]
    Corrupt {
        position: RecordPosition,
        reason: String,
    },

    /// The registry cannot describe this log or this record.
    #[error(transparent)]
    Registry(#[from] RegistrationError),

    /// An appended payload does not match its entry kind.
    #[error("payload rejected: {0}")]
    Shape(#[from] ShapeError),

    /// Append attempted on a log opened read-only.
    #[error("log is read-only")]
    ReadOnly,

    /// Read-only open of a log that does not exist.
    #[error("log not found: {0}")]
    NotFound(PathBuf),
}

impl LogError {
    pub fn corrupt(position: RecordPosition, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            position,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the stored log itself is damaged.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

/// Convenience alias used throughout the log crate.
pub type LogResult<T> = std::result::Result<T, LogError>;
