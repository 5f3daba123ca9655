use std::path::Path;

use caskade_registry::{EntryCode, EntryRegistry};
use caskade_types::ContentId;

use crate::config::LogConfig;
use crate::error::LogResult;
use crate::record::{LogRecord, RecordPosition};

/// One-shot, in-order pass over every record of a log.
///
/// The sequence stops after the first error.
pub type Replay<'a> = Box<dyn Iterator<Item = LogResult<(RecordPosition, LogRecord)>> + 'a>;

/// Append-only record log.
///
/// Implementations must satisfy these invariants:
/// - Records are never modified or reordered once appended.
/// - `append` either stores the whole record and returns its position, or
///   returns an error.
/// - `replay` yields records in append order and validates each one against
///   the registry the log was opened with.
/// - All I/O errors are propagated, never silently ignored.
pub trait RecordLog {
    /// Append a record. Fails with `ReadOnly` if the log is not writable.
    fn append(
        &mut self,
        kind: EntryCode,
        subject: ContentId,
        payload: &[u8],
    ) -> LogResult<RecordPosition>;

    /// Replay every record from the start of the log.
    fn replay(&self) -> LogResult<Replay<'_>>;

    fn is_writable(&self) -> bool;

    /// Force appended records to durable storage.
    fn flush(&mut self) -> LogResult<()>;

    /// Number of records in the log.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identity of this log, recorded in its segment header.
    fn log_id(&self) -> ContentId;

    /// Registry used to validate appended and replayed records.
    fn registry(&self) -> &EntryRegistry;
}

/// A log that lives at a filesystem path.
pub trait OpenLog: RecordLog + Sized {
    /// Open the log at `path`, creating it when the config allows writes.
    fn open_or_create(path: &Path, registry: &EntryRegistry, config: &LogConfig)
        -> LogResult<Self>;
}
