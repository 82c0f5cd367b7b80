//! Запись собранных рядов в таблицу и частичное обновление параметров ряда.

use crate::{
    error::{Result, SatsError},
    model::SeriesRecord,
    store::kv::{AttributeUpdate, BatchPutReport, Item, ItemKey},
    traits::{KvStore, RecordSink},
};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, warn};

pub struct TableSink<'a, S: KvStore> {
    table: &'a mut S,
}

impl<'a, S: KvStore> TableSink<'a, S> {
    pub fn new(table: &'a mut S) -> Self {
        TableSink { table }
    }
}

pub fn record_item(record: &SeriesRecord) -> Result<(ItemKey, Item)> {
    let key = ItemKey::new(&record.series_group_id, &record.series_id);
    match serde_json::to_value(record)? {
        Value::Object(item) => Ok((key, item)),
        other => Err(SatsError::Parse(format!("record serialized to non-object: {other}"))),
    }
}

impl<S: KvStore> RecordSink for TableSink<'_, S> {
    fn write_batch(&mut self, records: &[SeriesRecord]) -> Result<BatchPutReport> {
        let items = records.iter().map(record_item).collect::<Result<Vec<_>>>()?;
        let report = self
            .table
            .put_batch(items)
            .map_err(|e| SatsError::SinkWrite(e.to_string()))?;
        if report.is_complete() {
            info!(written = report.written, "records written");
        } else {
            warn!(written = report.written, failed = report.failed.len(), "records partially written");
        }
        Ok(report)
    }
}

/// Желаемый «размороженный» участок ряда (KeyParam.UnfrozenSpan).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnfrozenSpan {
    pub length_desired: Option<u32>,
    pub start_date_desired: Option<NaiveDate>,
}

impl UnfrozenSpan {
    pub fn updates(&self) -> Vec<AttributeUpdate> {
        let mut updates = Vec::new();
        if let Some(len) = self.length_desired {
            updates.push(AttributeUpdate::set("KeyParam.UnfrozenSpan.LengthDesired", len));
        }
        if let Some(date) = self.start_date_desired {
            updates.push(AttributeUpdate::set(
                "KeyParam.UnfrozenSpan.StartDateDesired",
                date.format("%Y-%m-%d").to_string(),
            ));
        }
        updates
    }
}

/// Обновляет span только у существующей записи; возвращает новые значения.
pub fn update_span<S: KvStore>(table: &mut S, key: &ItemKey, span: &UnfrozenSpan) -> Result<Item> {
    let updated = table.update_if_exists(key, &span.updates())?;
    info!(%key, "unfrozen span updated");
    Ok(updated)
}
