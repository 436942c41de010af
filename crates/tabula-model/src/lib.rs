//! Core in-memory data model for Tabula tables.
//!
//! This crate holds the plain data shared by the storage and engine crates:
//! - [`Record`]s: ordered, flat field maps handed over by the dataset loader
//! - [`Schema`]: column descriptions with a per-kind capability table
//! - filter/sort/page specs and the persisted [`ViewSettings`] shape
//! - derived chart types ([`ChartBucket`], [`Granularity`])
//!
//! Everything here is `serde`-serializable so it can cross the presentation boundary as JSON.

#![forbid(unsafe_code)]

pub mod date;
mod query;
mod record;
pub mod schema;
mod settings;
mod value;

pub use crate::query::{
    ChartBucket, FilterSpec, Granularity, PageSpec, ParseGranularityError, SortDirection,
    SortSpec, DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS,
};
pub use crate::record::Record;
pub use crate::schema::{
    ColumnCapabilities, ColumnKind, ColumnSpec, ResolvedColumn, Schema, SchemaError, SortKey,
    ValueError,
};
pub use crate::settings::{SettingsPatch, TableSettings, TableSettingsPatch, ViewSettings};
pub use crate::value::FieldValue;
