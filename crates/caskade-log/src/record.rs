use std::fmt;

use caskade_registry::EntryCode;
use caskade_types::ContentId;
use serde::{Deserialize, Serialize};

/// Zero-based sequence number of a record within its log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordPosition(u64);

impl RecordPosition {
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    pub const fn seq(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A record as the log engine sees it: kind code, subject, raw payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub kind: EntryCode,
    pub subject: ContentId,
    pub payload: Vec<u8>,
}

impl LogRecord {
    pub fn new(kind: EntryCode, subject: ContentId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            subject,
            payload: payload.into(),
        }
    }
}
