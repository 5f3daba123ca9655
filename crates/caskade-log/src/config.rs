use serde::{Deserialize, Serialize};

/// Flush/sync strategy for appended records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every append (safest, highest latency).
    EveryWrite,
    /// Flush to the OS after every append and rely on its page cache.
    #[default]
    OsDefault,
}

/// Whether a log is opened for replay only or for appending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    #[default]
    ReadOnly,
    Writable,
}

impl AccessMode {
    pub fn is_writable(self) -> bool {
        matches!(self, Self::Writable)
    }
}

/// Configuration for opening a log.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub access: AccessMode,
    pub sync_mode: SyncMode,
}

impl LogConfig {
    pub fn writable() -> Self {
        Self {
            access: AccessMode::Writable,
            ..Self::default()
        }
    }

    pub fn read_only() -> Self {
        Self::default()
    }
}
