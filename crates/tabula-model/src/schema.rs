//! Column schema: which fields a table shows and how each kind of column behaves.
//!
//! Column behavior is resolved once, when the [`Schema`] is built, into a static
//! [`ColumnCapabilities`] table per [`ColumnKind`]. The engine only ever calls through that
//! table, so adding a kind means adding one table entry.

use crate::date::{format_iso, parse_date};
use crate::record::Record;
use crate::value::FieldValue;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Free text; filtered by case-insensitive substring.
    #[default]
    Text,
    /// Categorical value; options are the distinct values present in the data.
    Select,
    /// ISO date string; sorted chronologically.
    Date,
}

impl ColumnKind {
    pub fn capabilities(self) -> &'static ColumnCapabilities {
        match self {
            ColumnKind::Text => &TEXT_CAPABILITIES,
            ColumnKind::Select => &SELECT_CAPABILITIES,
            ColumnKind::Date => &DATE_CAPABILITIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Field name in every record.
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
        }
    }

    pub fn text(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, ColumnKind::Text)
    }

    pub fn select(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, ColumnKind::Select)
    }

    pub fn date(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, ColumnKind::Date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("`{0}` is not a valid date")]
    InvalidDate(String),
    #[error("{kind:?} columns only accept text values")]
    NotText { kind: ColumnKind },
}

/// A comparable sort key extracted from a non-null field value.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            SortKey::Number(_) => 0,
            SortKey::Date(_) => 1,
            SortKey::Text(_) => 2,
        }
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Per-kind behavior table.
#[derive(Debug)]
pub struct ColumnCapabilities {
    /// Validate and normalize a committed edit.
    pub normalize: fn(FieldValue) -> Result<FieldValue, ValueError>,
    /// Sort key for a value; `None` sorts last.
    pub sort_key: fn(&FieldValue) -> Option<SortKey>,
    /// Whether a non-null value satisfies a non-empty filter predicate.
    pub matches: fn(&FieldValue, &str) -> bool,
    /// Whether the column offers a dynamic option list.
    pub has_options: bool,
}

static TEXT_CAPABILITIES: ColumnCapabilities = ColumnCapabilities {
    normalize: normalize_passthrough,
    sort_key: lexical_sort_key,
    matches: contains_case_insensitive,
    has_options: false,
};

static SELECT_CAPABILITIES: ColumnCapabilities = ColumnCapabilities {
    normalize: normalize_passthrough,
    sort_key: lexical_sort_key,
    matches: equals_exact,
    has_options: true,
};

static DATE_CAPABILITIES: ColumnCapabilities = ColumnCapabilities {
    normalize: normalize_date,
    sort_key: date_sort_key,
    matches: contains_case_insensitive,
    has_options: false,
};

fn normalize_passthrough(value: FieldValue) -> Result<FieldValue, ValueError> {
    Ok(value)
}

/// Dates are stored as `toISOString`-style timestamps. An empty string clears the date.
fn normalize_date(value: FieldValue) -> Result<FieldValue, ValueError> {
    match value {
        FieldValue::Null => Ok(FieldValue::Null),
        FieldValue::Text(s) if s.trim().is_empty() => Ok(FieldValue::Text(String::new())),
        FieldValue::Text(s) => match parse_date(&s) {
            Some(dt) => Ok(FieldValue::Text(format_iso(dt))),
            None => Err(ValueError::InvalidDate(s)),
        },
        FieldValue::Bool(_) | FieldValue::Number(_) => Err(ValueError::NotText {
            kind: ColumnKind::Date,
        }),
    }
}

fn lexical_sort_key(value: &FieldValue) -> Option<SortKey> {
    match value {
        FieldValue::Null => None,
        FieldValue::Number(n) => Some(SortKey::Number(*n)),
        other => other.match_text().map(|s| SortKey::Text(s.into_owned())),
    }
}

fn date_sort_key(value: &FieldValue) -> Option<SortKey> {
    value.as_date().map(SortKey::Date)
}

fn contains_case_insensitive(value: &FieldValue, needle: &str) -> bool {
    let Some(hay) = value.match_text() else {
        return false;
    };
    if hay.is_ascii() && needle.is_ascii() {
        return ascii_contains_case_insensitive(&hay, needle);
    }
    hay.to_lowercase().contains(&needle.to_lowercase())
}

fn ascii_contains_case_insensitive(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    if needle.len() > haystack.len() {
        return false;
    }
    for i in 0..=haystack.len() - needle.len() {
        if haystack[i..i + needle.len()].eq_ignore_ascii_case(needle) {
            return true;
        }
    }
    false
}

fn equals_exact(value: &FieldValue, needle: &str) -> bool {
    value.match_text().is_some_and(|s| s == needle)
}

/// Case-insensitive substring match, exposed for free-text search across columns.
pub fn text_contains(value: &FieldValue, needle: &str) -> bool {
    contains_case_insensitive(value, needle)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("column id must not be empty")]
    EmptyColumnId,
    #[error("duplicate column id: {0}")]
    DuplicateColumn(String),
}

/// A column with its capability table resolved.
#[derive(Debug, Clone)]
pub struct ResolvedColumn {
    pub spec: ColumnSpec,
    pub capabilities: &'static ColumnCapabilities,
}

impl ResolvedColumn {
    fn new(spec: ColumnSpec) -> Self {
        let capabilities = spec.kind.capabilities();
        Self { spec, capabilities }
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn kind(&self) -> ColumnKind {
        self.spec.kind
    }

    pub fn normalize(&self, value: FieldValue) -> Result<FieldValue, ValueError> {
        (self.capabilities.normalize)(value)
    }

    pub fn sort_key(&self, value: &FieldValue) -> Option<SortKey> {
        (self.capabilities.sort_key)(value)
    }

    /// Null values never satisfy a non-empty predicate; empty predicates always pass.
    pub fn matches(&self, value: &FieldValue, predicate: &str) -> bool {
        if predicate.is_empty() {
            return true;
        }
        if value.is_null() {
            return false;
        }
        (self.capabilities.matches)(value, predicate)
    }
}

/// Ordered set of columns shown by a table.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<ResolvedColumn>,
}

impl Schema {
    pub fn new(columns: impl IntoIterator<Item = ColumnSpec>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for spec in columns {
            if spec.id.is_empty() {
                return Err(SchemaError::EmptyColumnId);
            }
            if !seen.insert(spec.id.clone()) {
                return Err(SchemaError::DuplicateColumn(spec.id));
            }
            resolved.push(ResolvedColumn::new(spec));
        }
        Ok(Self { columns: resolved })
    }

    pub fn columns(&self) -> &[ResolvedColumn] {
        &self.columns
    }

    pub fn column(&self, id: &str) -> Option<&ResolvedColumn> {
        self.columns.iter().find(|c| c.spec.id == id)
    }

    /// Resolve a column for filtering/sorting. Ids outside the schema fall back to text
    /// semantics so a stale persisted filter never breaks the view.
    pub fn column_or_text(&self, id: &str) -> ResolvedColumn {
        self.column(id)
            .cloned()
            .unwrap_or_else(|| ResolvedColumn::new(ColumnSpec::text(id, id)))
    }

    /// Distinct non-null values for a `select` column, in first-seen order.
    ///
    /// Returns an empty list for columns without dynamic options.
    pub fn select_options(&self, id: &str, records: &[Record]) -> Vec<FieldValue> {
        let Some(column) = self.column(id) else {
            return Vec::new();
        };
        if !column.capabilities.has_options {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut options = Vec::new();
        for record in records {
            let value = record.value(id);
            let Some(text) = value.match_text() else {
                continue;
            };
            if seen.insert(text.into_owned()) {
                options.push(value.clone());
            }
        }
        options
    }

    /// `(label, display text)` pairs for every column, `"N/A"` for null/missing.
    pub fn row_details(&self, record: &Record) -> Vec<(String, String)> {
        self.columns
            .iter()
            .map(|c| {
                (
                    c.spec.label.clone(),
                    record.value(&c.spec.id).display().into_owned(),
                )
            })
            .collect()
    }
}
