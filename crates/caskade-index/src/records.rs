use std::collections::BTreeMap;
use std::fmt;

use caskade_registry::ValueRecord;
use caskade_types::ContentId;
use serde::{Deserialize, Serialize, Serializer};

/// User-attached annotation on a subject.
///
/// Absent optional fields are left out of the encoded payload. A value must
/// be finite: JSON has no encoding for NaN or the infinities, so encoding such
/// a tag fails instead of silently dropping the value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "finite_value")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<ContentId>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            link: None,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_link(mut self, link: ContentId) -> Self {
        self.link = Some(link);
        self
    }
}

fn finite_value<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) if !v.is_finite() => Err(serde::ser::Error::custom(format!(
            "tag value {v} is not finite"
        ))),
        _ => value.serialize(serializer),
    }
}

impl ValueRecord for Tag {
    const TYPE_NAME: &'static str = "Tag";
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(value) = self.value {
            write!(f, "={value}")?;
        }
        if let Some(link) = &self.link {
            write!(f, " -> {}", link.short_hex())?;
        }
        Ok(())
    }
}

/// Applying `filter` to the record's subject produced `derived`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivedEntry {
    pub filter: ContentId,
    pub derived: ContentId,
}

impl ValueRecord for DerivedEntry {
    const TYPE_NAME: &'static str = "DerivedEntry";
}

/// Store-to-marker mapping carried by sync-point and tracking records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMapping {
    pub mapping: BTreeMap<ContentId, ContentId>,
}

impl SyncMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, store: ContentId, marker: ContentId) -> Self {
        self.mapping.insert(store, marker);
        self
    }
}

impl ValueRecord for SyncMapping {
    const TYPE_NAME: &'static str = "SyncMapping";
}

impl FromIterator<(ContentId, ContentId)> for SyncMapping {
    fn from_iter<I: IntoIterator<Item = (ContentId, ContentId)>>(iter: I) -> Self {
        Self {
            mapping: iter.into_iter().collect(),
        }
    }
}
