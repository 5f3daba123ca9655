//! Optional entry kinds: derived artifacts, tags, and sync points.

use std::sync::LazyLock;

use caskade_registry::{EntryKind, EntryRegistry, PayloadShape, RegistrationError};

use crate::records::{DerivedEntry, SyncMapping, Tag};

pub const DERIVED: EntryKind = EntryKind::new(
    6,
    "DERIVED",
    PayloadShape::record::<DerivedEntry>(),
    "The subject points to source data. `filter` points to the logic that \
     was applied to it and `derived` to the data it produced.",
);

pub const TAG: EntryKind = EntryKind::new(
    7,
    "TAG",
    PayloadShape::record::<Tag>(),
    "The subject points to the tagged data; the payload is the tag body.",
);

pub const SYNC_POINT: EntryKind = EntryKind::new(
    8,
    "SYNC_POINT",
    PayloadShape::record::<SyncMapping>(),
    "The subject is a log store. The payload maps each paired external \
     store to the synchronization marker both sides agreed on.",
);

pub const TRACKING: EntryKind = EntryKind::new(
    9,
    "TRACKING",
    PayloadShape::record::<SyncMapping>(),
    "The subject is a log. The payload maps each store that tracks it to \
     the last marker that store has seen.",
);

pub const OPTIONAL_KINDS: [EntryKind; 4] = [DERIVED, TAG, SYNC_POINT, TRACKING];

static OPTIONAL_REGISTRY: LazyLock<Result<EntryRegistry, RegistrationError>> =
    LazyLock::new(|| EntryRegistry::base().extend(OPTIONAL_KINDS));

/// Base kinds plus [`OPTIONAL_KINDS`], built once per process.
pub fn optional_registry() -> Result<&'static EntryRegistry, RegistrationError> {
    OPTIONAL_REGISTRY.as_ref().map_err(Clone::clone)
}

/// Check that `registry` carries the optional kinds exactly as declared here.
pub fn check_optional_kinds(registry: &EntryRegistry) -> Result<(), RegistrationError> {
    check_kinds(registry, &OPTIONAL_KINDS)
}

/// Check that every kind in `kinds` is registered with the same name and shape.
pub fn check_kinds(
    registry: &EntryRegistry,
    kinds: &[EntryKind],
) -> Result<(), RegistrationError> {
    for kind in kinds {
        let found = registry.require(kind.code())?;
        if found != kind {
            return Err(RegistrationError::CatalogMismatch {
                code: kind.code(),
                expected: kind.to_string(),
                found: found.to_string(),
            });
        }
    }
    Ok(())
}
