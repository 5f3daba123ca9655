use std::collections::{BTreeMap, HashMap};

use caskade_log::LogRecord;
use caskade_registry::{ShapeError, ValueRecord};
use caskade_types::ContentId;

use crate::handler::RecordHandler;
use crate::kinds::{SYNC_POINT, TRACKING};
use crate::records::SyncMapping;

/// Sync-point and tracking mappings, keyed by subject.
///
/// Later records overwrite earlier ones key by key; stores not mentioned in a
/// record keep their previous marker.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncIndex {
    sync_points: HashMap<ContentId, BTreeMap<ContentId, ContentId>>,
    trackers: HashMap<ContentId, BTreeMap<ContentId, ContentId>>,
}

impl SyncIndex {
    pub fn merge_sync_points(&mut self, log_store: ContentId, mapping: SyncMapping) {
        self.sync_points
            .entry(log_store)
            .or_default()
            .extend(mapping.mapping);
    }

    pub fn merge_trackers(&mut self, log: ContentId, mapping: SyncMapping) {
        self.trackers.entry(log).or_default().extend(mapping.mapping);
    }

    /// External stores paired with `log_store`, and the marker for each.
    pub fn sync_points(&self, log_store: &ContentId) -> Option<&BTreeMap<ContentId, ContentId>> {
        self.sync_points.get(log_store)
    }

    pub fn sync_marker(&self, log_store: &ContentId, store: &ContentId) -> Option<ContentId> {
        self.sync_points.get(log_store)?.get(store).copied()
    }

    /// Stores tracking `log`, and the last marker each has seen.
    pub fn trackers(&self, log: &ContentId) -> Option<&BTreeMap<ContentId, ContentId>> {
        self.trackers.get(log)
    }

    pub fn is_empty(&self) -> bool {
        self.sync_points.is_empty() && self.trackers.is_empty()
    }
}

impl RecordHandler for SyncIndex {
    fn name(&self) -> &str {
        "sync"
    }

    fn check(&self, record: &LogRecord) -> Result<(), ShapeError> {
        if record.kind == SYNC_POINT.code() || record.kind == TRACKING.code() {
            SyncMapping::decode(&record.payload)?;
        }
        Ok(())
    }

    fn apply(&mut self, record: &LogRecord) -> Result<bool, ShapeError> {
        if record.kind == SYNC_POINT.code() {
            self.merge_sync_points(record.subject, SyncMapping::decode(&record.payload)?);
            Ok(true)
        } else if record.kind == TRACKING.code() {
            self.merge_trackers(record.subject, SyncMapping::decode(&record.payload)?);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
