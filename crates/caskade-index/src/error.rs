use caskade_log::{LogError, RecordPosition};
use caskade_registry::{RegistrationError, ShapeError};

use crate::view::ViewState;

/// Errors produced by the extended log view.
#[derive(Debug, thiserror::Error)]
pub enum CaskadeError {
    /// The entry-kind registry could not be built, or does not match the log.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// A record failed validation during replay. The log is unusable.
    #[error("corrupt log at record {position}: {reason}")]
    CorruptLog {
        position: RecordPosition,
        reason: String,
    },

    /// A write was attempted on a view that is not writable.
    #[error("view is {state}; writes need a writable view")]
    WriteState { state: ViewState },

    /// The underlying log failed, passed through unchanged.
    #[error(transparent)]
    Log(LogError),

    /// A value record could not be encoded.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<LogError> for CaskadeError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::Corrupt { position, reason } => Self::CorruptLog { position, reason },
            LogError::Registry(e) => Self::Registration(e),
            LogError::ReadOnly => Self::WriteState {
                state: ViewState::ReadOnly,
            },
            other => Self::Log(other),
        }
    }
}

/// Convenience alias used throughout the index crate.
pub type CaskadeResult<T> = std::result::Result<T, CaskadeError>;
