//! Optional entry kinds for caskade logs, and the indices replay builds from them.
//!
//! Opening a [`CaskadeView`] replays the underlying log from the start and
//! routes every record through a [`HandlerChain`]:
//!
//! - [`IndexStore`]: tags and derived artifacts per subject
//! - [`SyncIndex`]: sync-point and tracking mappings
//! - any [`RecordHandler`] added through [`CaskadeBuilder::with_handler`]
//!
//! Writes made through the view are appended to the log before they reach
//! the handlers, so an index rebuilt by replay always equals the live one.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use caskade_index::{CaskadeConfig, CaskadeView, Tag};
//! use caskade_types::ContentId;
//!
//! # fn run() -> caskade_index::CaskadeResult<()> {
//! let mut view = CaskadeView::open(Path::new("data.cask"), &CaskadeConfig::writable())?;
//! let subject = ContentId::from_bytes(b"hello");
//! view.tag(subject, &Tag::new("size").with_value(5.0))?;
//! assert_eq!(view.tags(&subject).len(), 1);
//! view.close()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod index;
pub mod kinds;
pub mod records;
pub mod sync;
pub mod view;

pub use config::CaskadeConfig;
pub use error::{CaskadeError, CaskadeResult};
pub use handler::{HandlerChain, RecordHandler};
pub use index::{IndexSnapshot, IndexStore};
pub use kinds::{optional_registry, DERIVED, OPTIONAL_KINDS, SYNC_POINT, TAG, TRACKING};
pub use records::{DerivedEntry, SyncMapping, Tag};
pub use sync::SyncIndex;
pub use view::{CaskadeBuilder, CaskadeView, ReplayStats, ViewState};
