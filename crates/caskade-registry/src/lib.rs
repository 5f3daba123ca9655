//! Entry-kind registry for caskade logs.
//!
//! A log stores records tagged with a numeric [`EntryCode`]. The registry maps
//! each code to an [`EntryKind`]: its name, documentation, and the
//! [`PayloadShape`] used to validate the record payload.
//!
//! The [`base`] kinds are fixed. Extension modules declare their own kinds as
//! constants and build an extended registry with [`EntryRegistry::extend`],
//! which rejects code collisions up front.

pub mod base;
pub mod error;
pub mod kind;
pub mod registry;
pub mod shape;

pub use error::{RegistrationError, ShapeError};
pub use kind::{EntryCode, EntryKind};
pub use registry::{Catalog, CatalogItem, EntryRegistry};
pub use shape::{PayloadShape, ValueRecord};
