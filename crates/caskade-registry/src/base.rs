//! The base entry kinds every caskade log understands.
//!
//! Codes 0 through 5 are reserved here. Extension modules pick codes above
//! [`LAST_BASE_CODE`].

use crate::kind::EntryKind;
use crate::registry::Catalog;
use crate::shape::PayloadShape;

pub const LAST_BASE_CODE: u8 = 5;

pub const DATA: EntryKind = EntryKind::new(
    0,
    "DATA",
    PayloadShape::Bytes,
    "Content bytes identified by the subject.",
);

pub const STREAM: EntryKind = EntryKind::new(
    1,
    "STREAM",
    PayloadShape::Bytes,
    "Chunk of the stream identified by the subject.",
);

pub const LINK: EntryKind = EntryKind::new(
    2,
    "LINK",
    PayloadShape::Bytes,
    "Link from the subject to another content identifier.",
);

pub const CHECK_POINT: EntryKind = EntryKind::new(
    3,
    "CHECK_POINT",
    PayloadShape::Bytes,
    "Checkpoint of the log section preceding it. \
     The subject is the hash of that section.",
);

pub const NEXT_CASK: EntryKind = EntryKind::new(
    4,
    "NEXT_CASK",
    PayloadShape::Empty,
    "Subject points to the next segment of the log.",
);

pub const CASK_HEADER: EntryKind = EntryKind::new(
    5,
    "CASK_HEADER",
    PayloadShape::record::<Catalog>(),
    "First record of every segment. The subject is the log id and the \
     payload is the catalog of entry kinds the log was created with.",
);

/// All base kinds in code order.
pub const BASE_KINDS: [EntryKind; 6] = [DATA, STREAM, LINK, CHECK_POINT, NEXT_CASK, CASK_HEADER];
