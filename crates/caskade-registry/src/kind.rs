use std::fmt;

use serde::{Deserialize, Serialize};

use crate::shape::PayloadShape;

/// Numeric code identifying an entry kind inside a log.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryCode(u8);

impl EntryCode {
    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    /// Slot of this code in a registry's decode table.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for EntryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryCode({})", self.0)
    }
}

impl fmt::Display for EntryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for EntryCode {
    fn from(code: u8) -> Self {
        Self(code)
    }
}

/// A registered record type.
///
/// Kinds are declared as constants by the module that owns them and are
/// immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryKind {
    code: EntryCode,
    name: &'static str,
    shape: PayloadShape,
    description: &'static str,
}

impl EntryKind {
    pub const fn new(
        code: u8,
        name: &'static str,
        shape: PayloadShape,
        description: &'static str,
    ) -> Self {
        Self {
            code: EntryCode::new(code),
            name,
            shape,
            description,
        }
    }

    pub fn code(&self) -> EntryCode {
        self.code
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> &PayloadShape {
        &self.shape
    }

    pub fn description(&self) -> &'static str {
        self.description
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.code)
    }
}
