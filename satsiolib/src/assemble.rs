//! Сборка ряда из тройки строк (original / SA / trend) и расчёт adjustment factor.

use crate::{
    calendar::generate_dates,
    error::{Result, SatsError},
    model::{DatedValue, DecompositionModel, RunContext, SeriesBatch, SeriesFailure, SeriesRecord, TabularRow},
    traits::ModelLookup,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Собирает один ряд. Строки тройки сопоставлены по индексу `index`
/// и обязаны совпадать по заголовку.
pub fn assemble<M: ModelLookup + ?Sized>(
    index: usize,
    original: &TabularRow,
    sa: &TabularRow,
    trend: &TabularRow,
    ctx: &RunContext,
    models: &M,
) -> Result<SeriesRecord> {
    check_aligned(index, original, sa, "seasonally adjusted")?;
    check_aligned(index, original, trend, "trend")?;

    // ось дат строится только для реально присутствующих значений
    let id = &original.series_id;
    let orig = take_values(id, original, "original")?;
    let adj = take_values(id, sa, "seasonally adjusted")?;
    let trd = take_values(id, trend, "trend")?;

    let dates = generate_dates(
        original.start_year,
        original.start_month,
        orig.len(),
        original.periodicity,
    )?;

    let model = models.model_for(id).unwrap_or_default();
    let factor = adjustment_factor(id, model, &dates, orig, adj)?;

    debug!(series_id = %id, ?model, values = dates.len(), "assembled series");

    Ok(SeriesRecord {
        series_id: id.clone(),
        series_group_id: ctx.series_group_id.clone(),
        run_id: ctx.run_id.clone(),
        execution_time: ctx.execution_time,
        workspace_id: ctx.workspace_id.clone(),
        decomposition_model: model,
        original: dated(&dates, orig),
        seasonally_adjusted: dated(&dates, adj),
        trend: dated(&dates, trd),
        adjustment_factor: dated(&dates, &factor),
    })
}

/// Собирает батч. Ошибка одного ряда не прерывает остальные:
/// она попадает в `errors`, успешные ряды в `series_list`.
pub fn assemble_batch<M: ModelLookup + ?Sized>(
    original: &[Result<TabularRow>],
    sa: &[Result<TabularRow>],
    trend: &[Result<TabularRow>],
    ctx: &RunContext,
    models: &M,
) -> SeriesBatch {
    let mut batch = SeriesBatch::empty(ctx);

    for (index, orig) in original.iter().enumerate() {
        let outcome = match (orig, sa.get(index), trend.get(index)) {
            (Err(e), _, _) => Err(row_error(e)),
            (Ok(o), None, _) => Err(missing_row(index, o, "seasonally adjusted")),
            (Ok(o), _, None) => Err(missing_row(index, o, "trend")),
            (Ok(_), Some(Err(e)), _) | (Ok(_), _, Some(Err(e))) => Err(row_error(e)),
            (Ok(o), Some(Ok(s)), Some(Ok(t))) => assemble(index, o, s, t, ctx, models),
        };
        match outcome {
            Ok(record) => batch.series_list.push(record),
            Err(e) => {
                warn!(index, error = %e, "series skipped");
                batch.errors.push(SeriesFailure::from_error(index, &e));
            }
        }
    }

    // лишние строки в SA / trend тоже ошибка выравнивания
    for (input, rows) in [("seasonally adjusted", sa), ("trend", trend)] {
        for (index, row) in rows.iter().enumerate().skip(original.len()) {
            let series_id = match row {
                Ok(r) => r.series_id.clone(),
                Err(e) => e.series_id().unwrap_or_default().to_string(),
            };
            let e = SatsError::RowAlignment {
                index,
                series_id,
                detail: format!("{input} input has a row with no original counterpart"),
            };
            warn!(index, error = %e, "series skipped");
            batch.errors.push(SeriesFailure::from_error(index, &e));
        }
    }

    batch
}

fn check_aligned(index: usize, original: &TabularRow, other: &TabularRow, input: &str) -> Result<()> {
    let mismatch = |field: &str, left: String, right: String| SatsError::RowAlignment {
        index,
        series_id: original.series_id.clone(),
        detail: format!("{field} differs between original ({left}) and {input} ({right})"),
    };

    if original.series_id != other.series_id {
        return Err(mismatch("series id", original.series_id.clone(), other.series_id.clone()));
    }
    if original.periodicity != other.periodicity {
        return Err(mismatch(
            "periodicity",
            original.periodicity.to_string(),
            other.periodicity.to_string(),
        ));
    }
    if original.start_year != other.start_year {
        return Err(mismatch(
            "start year",
            original.start_year.to_string(),
            other.start_year.to_string(),
        ));
    }
    if original.start_month != other.start_month {
        return Err(mismatch(
            "start month",
            original.start_month.to_string(),
            other.start_month.to_string(),
        ));
    }
    if original.value_count != other.value_count {
        return Err(mismatch(
            "value count",
            original.value_count.to_string(),
            other.value_count.to_string(),
        ));
    }
    Ok(())
}

fn take_values<'a>(series_id: &str, row: &'a TabularRow, input: &'static str) -> Result<&'a [Decimal]> {
    row.values
        .get(..row.value_count)
        .ok_or_else(|| SatsError::InsufficientData {
            series_id: series_id.to_string(),
            input,
            expected: row.value_count,
            found: row.values.len(),
        })
}

fn adjustment_factor(
    series_id: &str,
    model: DecompositionModel,
    dates: &[NaiveDate],
    original: &[Decimal],
    sa: &[Decimal],
) -> Result<Vec<Decimal>> {
    dates
        .iter()
        .zip(original.iter().zip(sa))
        .map(|(date, (o, s))| match model {
            DecompositionModel::Additive => o.checked_sub(*s).ok_or_else(|| SatsError::Arithmetic {
                series_id: series_id.to_string(),
                date: *date,
            }),
            DecompositionModel::Multiplicative => {
                if s.is_zero() {
                    return Err(SatsError::DivisionByZero {
                        series_id: series_id.to_string(),
                        date: *date,
                    });
                }
                o.checked_div(*s).ok_or_else(|| SatsError::Arithmetic {
                    series_id: series_id.to_string(),
                    date: *date,
                })
            }
        })
        .collect()
}

fn dated(dates: &[NaiveDate], values: &[Decimal]) -> Vec<DatedValue> {
    dates
        .iter()
        .zip(values)
        .map(|(date, value)| DatedValue { date: *date, value: *value })
        .collect()
}

/// Ошибки разбора хранятся в исходном `Vec`, поэтому пересобираем копию.
fn row_error(e: &SatsError) -> SatsError {
    match e {
        SatsError::RowParse { index, series_id, reason } => SatsError::RowParse {
            index: *index,
            series_id: series_id.clone(),
            reason: reason.clone(),
        },
        other => SatsError::Parse(other.to_string()),
    }
}

fn missing_row(index: usize, original: &TabularRow, input: &str) -> SatsError {
    SatsError::RowAlignment {
        index,
        series_id: original.series_id.clone(),
        detail: format!("{input} input has no row at this index"),
    }
}
