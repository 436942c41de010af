use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Display text used for absent/null values (matches the row detail view).
pub const NULL_DISPLAY: &str = "N/A";

/// A single scalar field value.
///
/// The dataset loader hands over JSON-like records, so besides text (plain strings, ISO date
/// strings and categories) we tolerate numbers, booleans and `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The stringified value used for substring matching, or `None` for null.
    pub fn match_text(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(true) => Some(Cow::Borrowed("true")),
            FieldValue::Bool(false) => Some(Cow::Borrowed("false")),
            FieldValue::Number(n) => Some(Cow::Owned(format_number(*n))),
            FieldValue::Text(s) => Some(Cow::Borrowed(s)),
        }
    }

    /// Display text, with `"N/A"` standing in for null.
    pub fn display(&self) -> Cow<'_, str> {
        self.match_text().unwrap_or(Cow::Borrowed(NULL_DISPLAY))
    }

    /// Interpret the value as a date, if it is text holding a parseable date.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        self.as_str().and_then(crate::date::parse_date)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Format a number the way the browser would print it: integral values without a fraction.
fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Normalize negative zero.
        return "0".to_string();
    }
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
