use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::base::BASE_KINDS;
use crate::error::RegistrationError;
use crate::kind::{EntryCode, EntryKind};
use crate::shape::ValueRecord;

/// Immutable table of entry kinds, indexed by code.
///
/// Registries are values: [`EntryRegistry::extend`] returns a new registry and
/// leaves the receiver untouched, so a base set can be shared by any number of
/// independent extensions. Decoding a code is a direct table index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryRegistry {
    table: Vec<Option<EntryKind>>,
    len: usize,
}

impl EntryRegistry {
    /// A registry with no kinds at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The base kinds every log understands.
    pub fn base() -> Self {
        let mut registry = Self::empty();
        for kind in BASE_KINDS {
            registry.insert(kind);
        }
        registry
    }

    /// Build a new registry holding `self`'s kinds plus `kinds`.
    ///
    /// Fails on the first code already taken, either by `self` or by an
    /// earlier kind in `kinds`. On failure no registry is produced.
    pub fn extend<I>(&self, kinds: I) -> Result<Self, RegistrationError>
    where
        I: IntoIterator<Item = EntryKind>,
    {
        let mut extended = self.clone();
        for kind in kinds {
            if let Some(existing) = extended.get(kind.code()) {
                return Err(RegistrationError::DuplicateCode {
                    code: kind.code(),
                    existing: existing.name(),
                    incoming: kind.name(),
                });
            }
            debug!(code = %kind.code(), name = kind.name(), "registering entry kind");
            extended.insert(kind);
        }
        Ok(extended)
    }

    /// Look up a kind by code.
    pub fn get(&self, code: EntryCode) -> Option<&EntryKind> {
        self.table.get(code.index()).and_then(Option::as_ref)
    }

    /// Like [`Self::get`], but an unknown code is an error.
    pub fn require(&self, code: EntryCode) -> Result<&EntryKind, RegistrationError> {
        self.get(code).ok_or(RegistrationError::UnknownCode(code))
    }

    pub fn contains(&self, code: EntryCode) -> bool {
        self.get(code).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Registered kinds in ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = &EntryKind> {
        self.table.iter().flatten()
    }

    /// Describe this registry for persisting alongside a log.
    pub fn catalog(&self) -> Catalog {
        Catalog {
            entries: self.iter().map(CatalogItem::from).collect(),
        }
    }

    /// Verify that a persisted catalog can be decoded with this registry.
    ///
    /// Every persisted code must be registered here with the same name and
    /// payload shape. Kinds registered here but absent from the catalog are
    /// fine: they simply never occur in that log.
    pub fn check_catalog(&self, catalog: &Catalog) -> Result<(), RegistrationError> {
        for item in &catalog.entries {
            let code = EntryCode::new(item.code);
            let expected = CatalogItem::from(self.require(code)?);
            if expected != *item {
                return Err(RegistrationError::CatalogMismatch {
                    code,
                    expected: expected.to_string(),
                    found: item.to_string(),
                });
            }
        }
        Ok(())
    }

    fn insert(&mut self, kind: EntryKind) {
        let slot = kind.code().index();
        if self.table.len() <= slot {
            self.table.resize(slot + 1, None);
        }
        self.table[slot] = Some(kind);
        self.len += 1;
    }
}

impl<'a> IntoIterator for &'a EntryRegistry {
    type Item = &'a EntryKind;
    type IntoIter = std::iter::Flatten<std::slice::Iter<'a, Option<EntryKind>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.table.iter().flatten()
    }
}

/// One row of a persisted catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub code: u8,
    pub name: String,
    pub shape: String,
}

impl From<&EntryKind> for CatalogItem {
    fn from(kind: &EntryKind) -> Self {
        Self {
            code: kind.code().value(),
            name: kind.name().to_string(),
            shape: kind.shape().label(),
        }
    }
}

impl std::fmt::Display for CatalogItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({}, {})", self.name, self.code, self.shape)
    }
}

/// The entry kinds a log was written with, in code order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub entries: Vec<CatalogItem>,
}

impl ValueRecord for Catalog {
    const TYPE_NAME: &'static str = "Catalog";
}
