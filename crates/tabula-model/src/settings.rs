use crate::query::{FilterSpec, PageSpec, SortSpec};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// User view preferences, persisted as one object.
///
/// Only the `table` branch is understood by the engine. Any other top-level branches found in
/// a persisted blob are carried along untouched so merges never drop them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    #[serde(default)]
    pub table: TableSettings,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSettings {
    #[serde(default)]
    pub filter: FilterSpec,
    #[serde(default)]
    pub sort: Option<SortSpec>,
    #[serde(default)]
    pub page: PageSpec,
}

/// A partial update to [`ViewSettings`]; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub table: Option<TableSettingsPatch>,
}

/// A partial update to [`TableSettings`].
///
/// `sort` distinguishes "leave unchanged" (`None`) from "clear the sort" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSettingsPatch {
    #[serde(default)]
    pub filter: Option<FilterSpec>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub sort: Option<Option<SortSpec>>,
    #[serde(default)]
    pub page_index: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl SettingsPatch {
    pub fn table(patch: TableSettingsPatch) -> Self {
        Self { table: Some(patch) }
    }
}

impl TableSettingsPatch {
    pub fn filter(filter: FilterSpec) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    pub fn sort(sort: Option<SortSpec>) -> Self {
        Self {
            sort: Some(sort),
            ..Self::default()
        }
    }

    pub fn page_index(page_index: usize) -> Self {
        Self {
            page_index: Some(page_index),
            ..Self::default()
        }
    }

    pub fn page_size(page_size: usize) -> Self {
        Self {
            page_size: Some(page_size),
            ..Self::default()
        }
    }
}

/// A field that is present (even as `null`) deserializes to `Some(..)`.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
