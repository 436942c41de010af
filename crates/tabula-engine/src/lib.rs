//! Client-side tabular data engine.
//!
//! Pipeline: base records → [`overlay::apply_overlay`] → [`view::view`] (filter, stable sort,
//! paginate) → visible slice. [`aggregate::aggregate`] reads the same overlay-applied records
//! independently of pagination. [`session::Session`] ties the pieces to the presentation
//! layer's callbacks and to a [`tabula_storage::PersistenceStore`].
//!
//! Everything except persistence is a pure, synchronous computation over in-memory data.

#![forbid(unsafe_code)]

pub mod aggregate;
mod error;
pub mod overlay;
pub mod session;
pub mod settings;
pub mod view;

pub use aggregate::{aggregate, BucketOrder};
pub use error::EditError;
pub use overlay::{apply_overlay, EditOverlay, FlushOutcome};
pub use session::{Session, SessionConfig, Warning};
pub use settings::{merge, SettingsController};
pub use view::{paginate, view, Page, ViewRow, ViewSlice};
