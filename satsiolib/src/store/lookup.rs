//! Справочники модели декомпозиции (additive / multiplicative) по рядам группы.

use crate::{
    error::{Result, SatsError},
    model::DecompositionModel,
    store::kv::{get_path, SORT_KEY},
    traits::{KvStore, ModelSource},
};
use csv::ReaderBuilder;
use serde_json::Value;
use std::{collections::HashMap, io::BufRead};
use tracing::debug;

pub const DEFAULT_MODEL_ATTRIBUTE: &str = "KeyParam.DecompositionModel";

/// Модель берётся из атрибута записей группы в таблице.
/// Запись без атрибута в справочник не попадает.
pub struct TableModelSource<'a, S: KvStore> {
    table: &'a S,
    attribute: String,
}

impl<'a, S: KvStore> TableModelSource<'a, S> {
    pub fn new(table: &'a S, attribute: impl Into<String>) -> Self {
        TableModelSource {
            table,
            attribute: attribute.into(),
        }
    }
}

impl<S: KvStore> ModelSource for TableModelSource<'_, S> {
    fn resolve(&self, series_group_id: &str) -> Result<HashMap<String, DecompositionModel>> {
        let mut models = HashMap::new();
        for item in self.table.query_group(series_group_id)? {
            let Some(series_id) = item.get(SORT_KEY).and_then(Value::as_str) else {
                continue;
            };
            match get_path(&item, &self.attribute) {
                None | Some(Value::Null) => {}
                Some(Value::String(tag)) => {
                    let model: DecompositionModel = tag
                        .parse()
                        .map_err(|e| SatsError::Parse(format!("series {series_id}: {e}")))?;
                    models.insert(series_id.to_string(), model);
                }
                Some(other) => {
                    return Err(SatsError::Parse(format!(
                        "series {series_id}: {} is not a string: {other}",
                        self.attribute
                    )))
                }
            }
        }
        debug!(series_group_id, resolved = models.len(), "resolved decomposition models");
        Ok(models)
    }
}

#[derive(serde::Deserialize)]
struct ModelRow {
    series_group_id: String,
    series_id: String,
    model: String,
}

/// CSV-справочник с заголовком: series_group_id,series_id,model
pub struct CsvModelSource {
    rows: Vec<(String, String, DecompositionModel)>,
}

impl CsvModelSource {
    pub fn read<R: BufRead>(r: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(r);
        let mut rows = Vec::new();
        for rec in rdr.deserialize::<ModelRow>() {
            let row = rec?;
            let model: DecompositionModel = row
                .model
                .parse()
                .map_err(|e| SatsError::Parse(format!("series {}: {e}", row.series_id)))?;
            rows.push((row.series_group_id, row.series_id, model));
        }
        Ok(CsvModelSource { rows })
    }
}

impl ModelSource for CsvModelSource {
    fn resolve(&self, series_group_id: &str) -> Result<HashMap<String, DecompositionModel>> {
        Ok(self
            .rows
            .iter()
            .filter(|(group, _, _)| group == series_group_id)
            .map(|(_, series, model)| (series.clone(), *model))
            .collect())
    }
}
