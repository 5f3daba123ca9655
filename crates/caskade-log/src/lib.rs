//! Log-engine boundary for caskade.
//!
//! The index layer only needs four things from a log: open it, append a
//! record, replay all records in order, and ask whether it accepts writes.
//! [`RecordLog`] and [`OpenLog`] capture exactly that. Two implementations
//! ship with the crate:
//!
//! - [`FileLog`]: single-segment file with length + CRC32 framing
//! - [`MemoryLog`]: vector-backed log for tests and embedding

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod record;
pub mod traits;

pub use config::{AccessMode, LogConfig, SyncMode};
pub use error::{LogError, LogResult};
pub use file::FileLog;
pub use memory::MemoryLog;
pub use record::{LogRecord, RecordPosition};
pub use traits::{OpenLog, RecordLog, Replay};
