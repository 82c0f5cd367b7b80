//! Доменные модели: входные строки CSV, собранные ряды и результат батча.

use crate::error::SatsError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Число наблюдений в году.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "i64", into = "i64")]
pub enum Periodicity {
    Quarterly,
    Monthly,
}

impl Periodicity {
    /// Шаг между соседними наблюдениями в календарных месяцах.
    pub fn months_per_step(self) -> u32 {
        match self {
            Periodicity::Monthly => 1,
            Periodicity::Quarterly => 3,
        }
    }
}

impl TryFrom<i64> for Periodicity {
    type Error = SatsError;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            12 => Ok(Periodicity::Monthly),
            4 => Ok(Periodicity::Quarterly),
            other => Err(SatsError::UnsupportedPeriodicity(other)),
        }
    }
}

impl From<Periodicity> for i64 {
    fn from(p: Periodicity) -> i64 {
        match p {
            Periodicity::Monthly => 12,
            Periodicity::Quarterly => 4,
        }
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i64::from(*self))
    }
}

/// Одна строка входного CSV: заголовок ряда и значения.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularRow {
    pub series_id: String,
    pub periodicity: Periodicity,
    pub start_year: i32,
    pub start_month: u32,
    pub value_count: usize,
    pub values: Vec<Decimal>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecompositionModel {
    #[default]
    Additive,
    Multiplicative,
}

impl FromStr for DecompositionModel {
    type Err = SatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "additive" | "add" | "a" => Ok(DecompositionModel::Additive),
            "multiplicative" | "mult" | "mul" | "m" => Ok(DecompositionModel::Multiplicative),
            other => Err(SatsError::Parse(format!("unknown decomposition model: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatedValue {
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
}

/// Параметры запуска, общие для всех рядов батча.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub series_group_id: String,
    pub run_id: String,
    pub execution_time: DateTime<Utc>,
    pub workspace_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeriesRecord {
    pub series_id: String,
    pub series_group_id: String,
    pub run_id: String,
    pub execution_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    pub decomposition_model: DecompositionModel,
    pub original: Vec<DatedValue>,
    pub seasonally_adjusted: Vec<DatedValue>,
    pub trend: Vec<DatedValue>,
    pub adjustment_factor: Vec<DatedValue>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RowParse,
    RowAlignment,
    InsufficientData,
    DivisionByZero,
    Arithmetic,
    InvalidDate,
    SinkWrite,
    Other,
}

/// Ошибка одного ряда; батч продолжает работу.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeriesFailure {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    pub kind: FailureKind,
    pub message: String,
}

impl SeriesFailure {
    pub fn from_error(index: usize, err: &SatsError) -> Self {
        SeriesFailure {
            index,
            series_id: err.series_id().map(str::to_owned),
            kind: err.failure_kind(),
            message: err.to_string(),
        }
    }
}

/// Результат батча: то, что уходит JSON-блобом в объектное хранилище.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeriesBatch {
    pub series_group_id: String,
    pub run_id: String,
    pub execution_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    pub series_list: Vec<SeriesRecord>,
    pub errors: Vec<SeriesFailure>,
}

impl SeriesBatch {
    pub fn empty(ctx: &RunContext) -> Self {
        SeriesBatch {
            series_group_id: ctx.series_group_id.clone(),
            run_id: ctx.run_id.clone(),
            execution_time: ctx.execution_time,
            workspace_id: ctx.workspace_id.clone(),
            series_list: Vec::new(),
            errors: Vec::new(),
        }
    }
}
