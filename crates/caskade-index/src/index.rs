use std::collections::{BTreeMap, HashMap};

use caskade_log::LogRecord;
use caskade_registry::{ShapeError, ValueRecord};
use caskade_types::ContentId;

use crate::handler::RecordHandler;
use crate::kinds::{DERIVED, TAG};
use crate::records::{DerivedEntry, Tag};

/// Tags and derived artifacts, keyed by subject.
///
/// - `tags[s]` is every tag written for `s`, in log order.
/// - `derived[s][f]` is the artifact from the last DERIVED record for `s`
///   with filter `f`.
#[derive(Clone, Debug, Default)]
pub struct IndexStore {
    tags: HashMap<ContentId, Vec<Tag>>,
    derived: HashMap<ContentId, HashMap<ContentId, ContentId>>,
}

impl IndexStore {
    pub fn add_tag(&mut self, subject: ContentId, tag: Tag) {
        self.tags.entry(subject).or_default().push(tag);
    }

    pub fn set_derived(&mut self, subject: ContentId, entry: DerivedEntry) {
        self.derived
            .entry(subject)
            .or_default()
            .insert(entry.filter, entry.derived);
    }

    /// Tag history of `subject`; empty if it was never tagged.
    pub fn tags(&self, subject: &ContentId) -> &[Tag] {
        self.tags.get(subject).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn derived(&self, subject: &ContentId, filter: &ContentId) -> Option<ContentId> {
        self.derived.get(subject)?.get(filter).copied()
    }

    /// Every filter → derived pair recorded for `subject`.
    pub fn derived_for(&self, subject: &ContentId) -> Option<&HashMap<ContentId, ContentId>> {
        self.derived.get(subject)
    }

    pub fn tagged_subjects(&self) -> impl Iterator<Item = &ContentId> {
        self.tags.keys()
    }

    pub fn derived_subjects(&self) -> impl Iterator<Item = &ContentId> {
        self.derived.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.derived.is_empty()
    }

    /// Ordered copy of both mappings, for comparison and inspection.
    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            tags: self
                .tags
                .iter()
                .map(|(subject, tags)| (*subject, tags.clone()))
                .collect(),
            derived: self
                .derived
                .iter()
                .map(|(subject, by_filter)| {
                    (*subject, by_filter.iter().map(|(f, d)| (*f, *d)).collect())
                })
                .collect(),
        }
    }
}

impl RecordHandler for IndexStore {
    fn name(&self) -> &str {
        "index"
    }

    fn check(&self, record: &LogRecord) -> Result<(), ShapeError> {
        if record.kind == TAG.code() {
            Tag::decode(&record.payload)?;
        } else if record.kind == DERIVED.code() {
            DerivedEntry::decode(&record.payload)?;
        }
        Ok(())
    }

    fn apply(&mut self, record: &LogRecord) -> Result<bool, ShapeError> {
        if record.kind == TAG.code() {
            self.add_tag(record.subject, Tag::decode(&record.payload)?);
            Ok(true)
        } else if record.kind == DERIVED.code() {
            self.set_derived(record.subject, DerivedEntry::decode(&record.payload)?);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Deterministically ordered copy of an [`IndexStore`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexSnapshot {
    pub tags: BTreeMap<ContentId, Vec<Tag>>,
    pub derived: BTreeMap<ContentId, BTreeMap<ContentId, ContentId>>,
}
