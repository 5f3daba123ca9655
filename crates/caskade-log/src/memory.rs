use std::io;

use caskade_registry::{base, EntryCode, EntryRegistry, ValueRecord};
use caskade_types::{ContentHasher, ContentId};
use tracing::debug;
use uuid::Uuid;

use crate::error::{LogError, LogResult};
use crate::record::{LogRecord, RecordPosition};
use crate::traits::{RecordLog, Replay};

/// In-memory log for tests and embedding.
///
/// Replay applies the same validation as the file log, so a `MemoryLog`
/// built from foreign records can stand in for a damaged log.
pub struct MemoryLog {
    registry: EntryRegistry,
    log_id: ContentId,
    records: Vec<LogRecord>,
    writable: bool,
    fail_next_append: bool,
}

impl MemoryLog {
    /// A fresh writable log holding only its segment header.
    pub fn new(registry: &EntryRegistry) -> LogResult<Self> {
        let log_id = ContentHasher::LOG.hash(Uuid::now_v7().as_bytes());
        let mut log = Self {
            registry: registry.clone(),
            log_id,
            records: Vec::new(),
            writable: true,
            fail_next_append: false,
        };
        let catalog = registry.catalog().encode()?;
        log.append(base::CASK_HEADER.code(), log_id, &catalog)?;
        Ok(log)
    }

    /// Wrap records produced elsewhere. They are not validated until replay.
    pub fn from_records(
        registry: &EntryRegistry,
        log_id: ContentId,
        records: Vec<LogRecord>,
    ) -> Self {
        Self {
            registry: registry.clone(),
            log_id,
            records,
            writable: false,
            fail_next_append: false,
        }
    }

    /// Switch the log to read-only or writable.
    pub fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    /// Make the next `append` fail with an I/O error without storing anything.
    pub fn fail_next_append(&mut self) {
        self.fail_next_append = true;
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }
}

impl RecordLog for MemoryLog {
    fn append(
        &mut self,
        kind: EntryCode,
        subject: ContentId,
        payload: &[u8],
    ) -> LogResult<RecordPosition> {
        let entry_kind = self.registry.require(kind)?;
        entry_kind.shape().validate(payload)?;
        if !self.writable {
            return Err(LogError::ReadOnly);
        }
        if std::mem::take(&mut self.fail_next_append) {
            return Err(io::Error::other("injected append failure").into());
        }

        let position = RecordPosition::new(self.records.len() as u64);
        self.records.push(LogRecord::new(kind, subject, payload));
        debug!(%position, kind = entry_kind.name(), "memory log append");
        Ok(position)
    }

    fn replay(&self) -> LogResult<Replay<'_>> {
        let registry = &self.registry;
        let mut failed = false;
        let records = self.records.iter().enumerate().map_while(move |(seq, record)| {
            if failed {
                return None;
            }
            let position = RecordPosition::new(seq as u64);
            let checked = registry
                .get(record.kind)
                .ok_or_else(|| format!("unregistered entry code {}", record.kind))
                .and_then(|kind| {
                    kind.shape()
                        .validate(&record.payload)
                        .map_err(|e| format!("{kind}: {e}"))
                });
            match checked {
                Ok(()) => Some(Ok((position, record.clone()))),
                Err(reason) => {
                    failed = true;
                    Some(Err(LogError::corrupt(position, reason)))
                }
            }
        });
        Ok(Box::new(records))
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn flush(&mut self) -> LogResult<()> {
        Ok(())
    }

    fn len(&self) -> u64 {
        self.records.len() as u64
    }

    fn log_id(&self) -> ContentId {
        self.log_id
    }

    fn registry(&self) -> &EntryRegistry {
        &self.registry
    }
}
