//! Единый тип ошибок публичного API.

use crate::model::FailureKind;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SatsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("row {index}: malformed row ({reason})")]
    RowParse {
        index: usize,
        series_id: Option<String>,
        reason: String,
    },

    #[error("row {index}: series {series_id}: {detail}")]
    RowAlignment {
        index: usize,
        series_id: String,
        detail: String,
    },

    #[error("series {series_id}: {input} has {found} values, header declares {expected}")]
    InsufficientData {
        series_id: String,
        input: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("series {series_id}: seasonally adjusted value is zero at {date}")]
    DivisionByZero { series_id: String, date: NaiveDate },

    #[error("series {series_id}: decimal overflow at {date}")]
    Arithmetic { series_id: String, date: NaiveDate },

    #[error("unsupported periodicity: {0} (expected 4 or 12)")]
    UnsupportedPeriodicity(i64),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid store key: {0}")]
    InvalidKey(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conditional check failed: item {0} does not exist")]
    ConditionalCheckFailed(String),

    #[error("no attributes to update")]
    NothingToUpdate,

    #[error("sink write failed: {0}")]
    SinkWrite(String),
}

impl SatsError {
    /// Категория ошибки для списка ошибок батча.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            SatsError::RowParse { .. } | SatsError::UnsupportedPeriodicity(_) => FailureKind::RowParse,
            SatsError::RowAlignment { .. } => FailureKind::RowAlignment,
            SatsError::InsufficientData { .. } => FailureKind::InsufficientData,
            SatsError::DivisionByZero { .. } => FailureKind::DivisionByZero,
            SatsError::Arithmetic { .. } => FailureKind::Arithmetic,
            SatsError::InvalidDate(_) => FailureKind::InvalidDate,
            SatsError::SinkWrite(_) => FailureKind::SinkWrite,
            _ => FailureKind::Other,
        }
    }

    /// Идентификатор ряда, если ошибка к нему привязана.
    pub fn series_id(&self) -> Option<&str> {
        match self {
            SatsError::RowParse { series_id, .. } => series_id.as_deref(),
            SatsError::RowAlignment { series_id, .. }
            | SatsError::InsufficientData { series_id, .. }
            | SatsError::DivisionByZero { series_id, .. }
            | SatsError::Arithmetic { series_id, .. } => Some(series_id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SatsError>;
