//! CSV рядов без заголовка:
//! series_id,periodicity,start_year,start_month,value_count,v1,v2,...
//!
//! Строки разной длины допустимы, хвостовые пустые ячейки отбрасываются.

use crate::{
    error::{Result, SatsError},
    model::{Periodicity, TabularRow},
    traits::{ReadRows, WriteRows},
};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use std::io::{BufRead, Write};
use std::str::FromStr;

const HEADER_FIELDS: usize = 5;

pub struct SeriesCsv;

impl ReadRows for SeriesCsv {
    fn read_rows<R: BufRead>(r: R) -> Result<Vec<Result<TabularRow>>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(r);

        let mut rows = Vec::new();
        for (index, rec) in rdr.records().enumerate() {
            match rec {
                Ok(rec) => rows.push(parse_row(index, &rec)),
                // сбой чтения источника, а не ошибка строки
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => rows.push(Err(SatsError::RowParse {
                    index,
                    series_id: None,
                    reason: e.to_string(),
                })),
            }
        }
        Ok(rows)
    }
}

impl WriteRows for SeriesCsv {
    fn write_rows<W: Write>(w: W, rows: &[TabularRow]) -> Result<()> {
        let mut wrt = WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(w);

        for row in rows {
            let mut rec = vec![
                row.series_id.clone(),
                row.periodicity.to_string(),
                row.start_year.to_string(),
                row.start_month.to_string(),
                row.value_count.to_string(),
            ];
            rec.extend(row.values.iter().map(Decimal::to_string));
            wrt.write_record(&rec)?;
        }
        wrt.flush()?;
        Ok(())
    }
}

fn parse_row(index: usize, rec: &StringRecord) -> Result<TabularRow> {
    let fields: Vec<&str> = rec.iter().collect();
    let used = fields.iter().rposition(|f| !f.is_empty()).map_or(0, |p| p + 1);
    let fields = &fields[..used];

    let series_id = fields.first().filter(|s| !s.is_empty()).map(|s| s.to_string());
    let bad = |reason: String| SatsError::RowParse {
        index,
        series_id: series_id.clone(),
        reason,
    };

    if fields.len() < HEADER_FIELDS {
        return Err(bad(format!(
            "expected at least {HEADER_FIELDS} header fields, found {}",
            fields.len()
        )));
    }
    let id = series_id.clone().ok_or_else(|| bad("empty series id".into()))?;

    let periodicity = Periodicity::try_from(parse_int(fields[1]).map_err(|e| bad(format!("periodicity: {e}")))?)
        .map_err(|e| bad(e.to_string()))?;
    let start_year = i32::try_from(parse_int(fields[2]).map_err(|e| bad(format!("start year: {e}")))?)
        .map_err(|e| bad(format!("start year: {e}")))?;
    let start_month = u32::try_from(parse_int(fields[3]).map_err(|e| bad(format!("start month: {e}")))?)
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| bad(format!("start month {} is not in 1..=12", fields[3])))?;
    let value_count = usize::try_from(parse_int(fields[4]).map_err(|e| bad(format!("value count: {e}")))?)
        .map_err(|e| bad(format!("value count: {e}")))?;

    let values = fields[HEADER_FIELDS..]
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let column = HEADER_FIELDS + i;
            if raw.is_empty() {
                return Err(bad(format!("empty value in column {column}")));
            }
            parse_decimal(raw).map_err(|e| bad(format!("column {column}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TabularRow {
        series_id: id,
        periodicity,
        start_year,
        start_month,
        value_count,
        values,
    })
}

/// Десятичное значение: обычная или научная запись ("1.5e3").
pub fn parse_decimal(s: &str) -> std::result::Result<Decimal, String> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|e| format!("not a number {s:?}: {e}"))
}

/// Целое, допускается запись с нулевой дробной частью ("12.0").
fn parse_int(s: &str) -> std::result::Result<i64, String> {
    if let Ok(v) = s.parse::<i64>() {
        return Ok(v);
    }
    let d = parse_decimal(s)?;
    if !d.fract().is_zero() {
        return Err(format!("{s:?} is not an integer"));
    }
    d.to_i64().ok_or_else(|| format!("{s:?} is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_accept_trailing_zero_fraction() {
        assert_eq!(parse_int("12"), Ok(12));
        assert_eq!(parse_int("12.0"), Ok(12));
        assert!(parse_int("12.5").is_err());
        assert!(parse_int("twelve").is_err());
    }

    #[test]
    fn decimals_keep_their_scale() {
        assert_eq!(parse_decimal("54.32").unwrap().to_string(), "54.32");
        assert_eq!(parse_decimal("1.5e3").unwrap(), Decimal::new(1500, 0));
    }
}
