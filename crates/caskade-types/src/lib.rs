//! Foundation types for caskade.
//!
//! - [`ContentId`]: opaque 32-byte content identifier with a hex text form
//! - [`ContentHasher`]: domain-separated BLAKE3 hashing into `ContentId`s

pub mod error;
pub mod hasher;
pub mod id;

pub use error::TypeError;
pub use hasher::ContentHasher;
pub use id::{ContentId, CONTENT_ID_LEN};
