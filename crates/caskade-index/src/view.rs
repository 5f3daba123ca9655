use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use caskade_log::{AccessMode, FileLog, LogConfig, LogRecord, OpenLog, RecordLog, RecordPosition};
use caskade_registry::{EntryKind, EntryRegistry, ValueRecord};
use caskade_types::ContentId;
use tracing::{debug, info};

use crate::config::CaskadeConfig;
use crate::error::{CaskadeError, CaskadeResult};
use crate::handler::{HandlerChain, RecordHandler};
use crate::index::{IndexSnapshot, IndexStore};
use crate::kinds::{check_kinds, check_optional_kinds, optional_registry};
use crate::kinds::{DERIVED, SYNC_POINT, TAG, TRACKING};
use crate::records::{DerivedEntry, SyncMapping, Tag};
use crate::sync::SyncIndex;

/// Whether a view accepts writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewState {
    ReadOnly,
    Writable,
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => f.write_str("read-only"),
            Self::Writable => f.write_str("writable"),
        }
    }
}

/// Counts gathered while replaying a log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Records read, segment header included.
    pub records: u64,
    /// Records claimed by a handler.
    pub handled: u64,
    /// Records of registered kinds that no handler claimed.
    pub unclaimed: u64,
}

/// A log opened with the optional entry kinds, plus the indices rebuilt from it.
///
/// Construction replays the whole log before returning, so every query sees
/// the state implied by the full record sequence. Writes go through the log
/// first and reach the indices only once the append has succeeded.
pub struct CaskadeView<L: RecordLog = FileLog> {
    log: L,
    chain: HandlerChain,
    stats: ReplayStats,
    /// Records below this position have been dispatched to the chain.
    applied: u64,
}

impl CaskadeView<FileLog> {
    /// Open (or create) the log at `path` with the optional kinds only.
    pub fn open(path: &Path, config: &CaskadeConfig) -> CaskadeResult<Self> {
        CaskadeBuilder::new().open(path, config)
    }

    /// Reopen a read-only view for writing.
    ///
    /// The indices built so far are kept; records appended by another writer
    /// since this view was opened are replayed on top of them. On failure the
    /// view is gone and must be reopened.
    pub fn into_writable(self) -> CaskadeResult<Self> {
        if self.log.is_writable() {
            return Ok(self);
        }
        let Self {
            log,
            chain,
            stats,
            applied,
        } = self;
        let path = log.path().to_path_buf();
        let registry = log.registry().clone();
        let config = LogConfig {
            access: AccessMode::Writable,
            ..log.config().clone()
        };
        drop(log);

        let log = FileLog::open_or_create(&path, &registry, &config)?;
        let mut view = Self {
            log,
            chain,
            stats,
            applied,
        };
        view.catch_up()?;
        info!(path = %path.display(), records = view.stats.records, "view is now writable");
        Ok(view)
    }

    pub fn path(&self) -> &Path {
        self.log.path()
    }
}

impl<L: RecordLog> CaskadeView<L> {
    /// Build a view over an already-open log with the optional kinds only.
    pub fn from_log(log: L) -> CaskadeResult<Self> {
        CaskadeBuilder::new().attach(log)
    }

    fn with_chain(log: L, chain: HandlerChain) -> CaskadeResult<Self> {
        let mut view = Self {
            log,
            chain,
            stats: ReplayStats::default(),
            applied: 0,
        };
        view.catch_up()?;
        info!(
            log_id = %view.log.log_id().short_hex(),
            records = view.stats.records,
            handled = view.stats.handled,
            unclaimed = view.stats.unclaimed,
            state = %view.state(),
            "replayed log"
        );
        Ok(view)
    }

    /// Dispatch every record not yet applied through the chain.
    ///
    /// Earlier records are still read and validated but not applied again.
    fn catch_up(&mut self) -> CaskadeResult<()> {
        let Self {
            log,
            chain,
            stats,
            applied,
        } = self;
        for item in log.replay()? {
            let (position, record) = item?;
            if position.seq() < *applied {
                continue;
            }
            *applied = position.seq() + 1;
            stats.records += 1;
            let claimed = chain
                .dispatch(&record)
                .map_err(|e| CaskadeError::CorruptLog {
                    position,
                    reason: e.to_string(),
                })?;
            if claimed {
                stats.handled += 1;
            } else {
                stats.unclaimed += 1;
                debug!(%position, kind = %record.kind, "record not claimed by any handler");
            }
        }
        Ok(())
    }

    // -- Write gateway ---------------------------------------------------

    /// Attach `tag` to `subject`.
    pub fn tag(&mut self, subject: ContentId, tag: &Tag) -> CaskadeResult<RecordPosition> {
        self.write_record(&TAG, subject, tag)
    }

    /// Record that applying `filter` to `subject` produced `derived`.
    ///
    /// A later call with the same subject and filter replaces the artifact.
    pub fn save_derived(
        &mut self,
        subject: ContentId,
        filter: ContentId,
        derived: ContentId,
    ) -> CaskadeResult<RecordPosition> {
        self.write_record(&DERIVED, subject, &DerivedEntry { filter, derived })
    }

    /// Record the markers `log_store` agreed on with each paired store.
    pub fn set_sync_point(
        &mut self,
        log_store: ContentId,
        mapping: &SyncMapping,
    ) -> CaskadeResult<RecordPosition> {
        self.write_record(&SYNC_POINT, log_store, mapping)
    }

    /// Record the last marker each tracking store has seen of `log`.
    pub fn track(
        &mut self,
        log: ContentId,
        mapping: &SyncMapping,
    ) -> CaskadeResult<RecordPosition> {
        self.write_record(&TRACKING, log, mapping)
    }

    /// Encode `value` and append it as a record of `kind`.
    pub fn write_record<R: ValueRecord>(
        &mut self,
        kind: &EntryKind,
        subject: ContentId,
        value: &R,
    ) -> CaskadeResult<RecordPosition> {
        self.ensure_writable()?;
        let payload = value.encode()?;
        self.append(kind, subject, payload)
    }

    /// Append a raw payload of any registered kind.
    ///
    /// Every handler checks the record first, then it is appended. Only after
    /// the log has accepted it is it dispatched to the handlers, so a rejected
    /// or failed append changes nothing.
    pub fn append(
        &mut self,
        kind: &EntryKind,
        subject: ContentId,
        payload: impl Into<Vec<u8>>,
    ) -> CaskadeResult<RecordPosition> {
        self.ensure_writable()?;
        let record = LogRecord::new(kind.code(), subject, payload);
        self.chain.check(&record)?;
        let position = self
            .log
            .append(record.kind, record.subject, &record.payload)?;
        self.applied = position.seq() + 1;
        self.chain
            .dispatch(&record)
            .map_err(|e| CaskadeError::CorruptLog {
                position,
                reason: e.to_string(),
            })?;
        debug!(%position, kind = kind.name(), subject = %subject.short_hex(), "write");
        Ok(position)
    }

    fn ensure_writable(&self) -> CaskadeResult<()> {
        match self.state() {
            ViewState::Writable => Ok(()),
            state => Err(CaskadeError::WriteState { state }),
        }
    }

    /// Flush the log and release it.
    pub fn close(mut self) -> CaskadeResult<()> {
        if self.log.is_writable() {
            self.log.flush()?;
        }
        debug!(log_id = %self.log.log_id().short_hex(), "closed view");
        Ok(())
    }

    // -- Queries ---------------------------------------------------------

    /// Tags written for `subject`, oldest first.
    pub fn tags(&self, subject: &ContentId) -> &[Tag] {
        self.chain.index.tags(subject)
    }

    pub fn derived(&self, subject: &ContentId, filter: &ContentId) -> Option<ContentId> {
        self.chain.index.derived(subject, filter)
    }

    pub fn derived_for(&self, subject: &ContentId) -> Option<&HashMap<ContentId, ContentId>> {
        self.chain.index.derived_for(subject)
    }

    pub fn sync_points(&self, log_store: &ContentId) -> Option<&BTreeMap<ContentId, ContentId>> {
        self.chain.sync.sync_points(log_store)
    }

    pub fn sync_marker(&self, log_store: &ContentId, store: &ContentId) -> Option<ContentId> {
        self.chain.sync.sync_marker(log_store, store)
    }

    pub fn trackers(&self, log: &ContentId) -> Option<&BTreeMap<ContentId, ContentId>> {
        self.chain.sync.trackers(log)
    }

    /// Every subject with at least one tag or derived artifact.
    pub fn subjects(&self) -> BTreeSet<ContentId> {
        let index = &self.chain.index;
        index
            .tagged_subjects()
            .chain(index.derived_subjects())
            .copied()
            .collect()
    }

    pub fn index(&self) -> &IndexStore {
        &self.chain.index
    }

    pub fn sync(&self) -> &SyncIndex {
        &self.chain.sync
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        self.chain.index.snapshot()
    }

    /// Counts from the replay that built this view.
    pub fn replay_stats(&self) -> ReplayStats {
        self.stats
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.chain.names()
    }

    pub fn state(&self) -> ViewState {
        if self.log.is_writable() {
            ViewState::Writable
        } else {
            ViewState::ReadOnly
        }
    }

    pub fn log_id(&self) -> ContentId {
        self.log.log_id()
    }

    pub fn log(&self) -> &L {
        &self.log
    }
}

/// Opens views with extra entry kinds and handlers.
///
/// ```no_run
/// # use caskade_index::{CaskadeBuilder, CaskadeConfig};
/// # fn run(path: &std::path::Path) -> caskade_index::CaskadeResult<()> {
/// let view = CaskadeBuilder::new().open(path, &CaskadeConfig::writable())?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct CaskadeBuilder {
    kinds: Vec<EntryKind>,
    handlers: Vec<Box<dyn RecordHandler>>,
}

impl CaskadeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register more entry kinds on top of the base and optional ones.
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = EntryKind>) -> Self {
        self.kinds.extend(kinds);
        self
    }

    /// Append a handler to the chain, after the built-in ones.
    pub fn with_handler(mut self, handler: impl RecordHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// The registry a log opened by this builder is validated with.
    pub fn registry(&self) -> CaskadeResult<EntryRegistry> {
        Ok(optional_registry()?.extend(self.kinds.iter().cloned())?)
    }

    pub fn open(self, path: &Path, config: &CaskadeConfig) -> CaskadeResult<CaskadeView<FileLog>> {
        let registry = self.registry()?;
        let log = FileLog::open_or_create(path, &registry, &config.log_config())?;
        self.attach(log)
    }

    /// Replay `log` and build a view over it.
    ///
    /// The log's registry must carry the optional kinds and every kind given
    /// to [`Self::with_kinds`].
    pub fn attach<L: RecordLog>(self, log: L) -> CaskadeResult<CaskadeView<L>> {
        check_optional_kinds(log.registry())?;
        check_kinds(log.registry(), &self.kinds)?;
        CaskadeView::with_chain(log, HandlerChain::new(self.handlers))
    }
}
