use tabula_model::ValueError;
use thiserror::Error;

/// Rejected presentation-layer input. None of these affect the session's existing state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("record index {index} is out of range ({len} records)")]
    RecordOutOfRange { index: usize, len: usize },
    #[error("invalid value for column `{column}`: {source}")]
    InvalidValue {
        column: String,
        #[source]
        source: ValueError,
    },
    #[error("unsupported page size {0}")]
    UnsupportedPageSize(usize),
}
