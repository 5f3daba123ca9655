use caskade_log::LogRecord;
use caskade_registry::ShapeError;

use crate::index::IndexStore;
use crate::sync::SyncIndex;

/// An extension module's replay hook.
///
/// Handlers form a chain of responsibility. Each one inspects the record's
/// kind code and either claims the record (returns `true`) or passes it on
/// (returns `false`). A handler must claim only the kinds it owns, so new
/// modules can be added without editing existing ones.
///
/// The same `apply` runs during replay and after every successful write;
/// derived state is therefore a function of the record sequence alone.
///
/// Before a write is appended, every handler's `check` sees the record. A
/// record that passes `check` must also pass `apply`: once it is in the log it
/// can no longer be refused, and a later `apply` failure makes the log
/// unreadable.
pub trait RecordHandler: Send {
    /// Human-readable name of this handler (for logs).
    fn name(&self) -> &str;

    /// Reject a record this handler would fail to apply. Foreign kinds pass.
    fn check(&self, record: &LogRecord) -> Result<(), ShapeError>;

    /// Apply a record this handler owns. A payload that fails to decode is an
    /// error; a record of a foreign kind returns `Ok(false)`.
    fn apply(&mut self, record: &LogRecord) -> Result<bool, ShapeError>;
}

/// Ordered handler chain: built-in indices first, then extensions in the
/// order they were added.
pub struct HandlerChain {
    pub(crate) index: IndexStore,
    pub(crate) sync: SyncIndex,
    extensions: Vec<Box<dyn RecordHandler>>,
}

impl HandlerChain {
    pub fn new(extensions: Vec<Box<dyn RecordHandler>>) -> Self {
        Self {
            index: IndexStore::default(),
            sync: SyncIndex::default(),
            extensions,
        }
    }

    /// Offer `record` to each handler until one claims it.
    pub fn dispatch(&mut self, record: &LogRecord) -> Result<bool, ShapeError> {
        if self.index.apply(record)? || self.sync.apply(record)? {
            return Ok(true);
        }
        for handler in &mut self.extensions {
            if handler.apply(record)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Run every handler's `check` against a record about to be written.
    pub fn check(&self, record: &LogRecord) -> Result<(), ShapeError> {
        self.index.check(record)?;
        self.sync.check(record)?;
        for handler in &self.extensions {
            handler.check(record)?;
        }
        Ok(())
    }

    /// Names of all handlers in dispatch order.
    pub fn names(&self) -> Vec<&str> {
        let mut names = vec![self.index.name(), self.sync.name()];
        names.extend(self.extensions.iter().map(|h| h.name()));
        names
    }
}
