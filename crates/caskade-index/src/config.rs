use std::fs;
use std::path::Path;

use caskade_log::{AccessMode, LogConfig, SyncMode};
use serde::{Deserialize, Serialize};

use crate::error::{CaskadeError, CaskadeResult};

/// Configuration for opening a [`CaskadeView`](crate::CaskadeView).
///
/// Loadable from TOML:
///
/// ```toml
/// access = "writable"
/// sync_mode = "every_write"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaskadeConfig {
    /// Open for replay only, or for replay and writes.
    pub access: AccessMode,
    /// Durability of each write.
    pub sync_mode: SyncMode,
}

impl CaskadeConfig {
    pub fn writable() -> Self {
        Self {
            access: AccessMode::Writable,
            ..Self::default()
        }
    }

    pub fn read_only() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str) -> CaskadeResult<Self> {
        toml::from_str(text).map_err(|e| CaskadeError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> CaskadeResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| CaskadeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// The log-engine settings this config implies.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            access: self.access,
            sync_mode: self.sync_mode,
        }
    }
}
