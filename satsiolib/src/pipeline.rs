//! Полный прогон: три CSV из объектного хранилища → батч рядов →
//! записи в таблице + JSON-блоб. При сбое пишется блоб с ошибкой.

use crate::{
    assemble::assemble_batch,
    config::Config,
    error::Result,
    formats::csv::SeriesCsv,
    model::{FailureKind, RunContext, SeriesBatch, SeriesFailure, TabularRow},
    store::{lookup::TableModelSource, sink::TableSink},
    traits::{BlobStore, KvStore, ModelSource, ReadRows, RecordSink},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

/// Событие запуска.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    pub run_id: String,
    pub series_group_id: String,
    pub bucket_name: String,
    #[serde(default)]
    pub output_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    /// Ошибки предыдущего шага; если есть, прогон не выполняется.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RunOutcome {
    #[serde(rename_all = "camelCase")]
    Succeeded {
        bucket_name: String,
        object_key: String,
        record_count: usize,
        error_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        bucket_name: String,
        error_key: String,
        message: String,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded { .. })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorReport<'a> {
    series_group_id: &'a str,
    run_id: &'a str,
    execution_time: DateTime<Utc>,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a Value>,
    /// Собранный батч, если сбой случился при записи результатов.
    #[serde(skip_serializing_if = "Option::is_none")]
    batch: Option<&'a SeriesBatch>,
}

pub struct Pipeline<B: BlobStore, S: KvStore> {
    config: Config,
    blobs: B,
    table: S,
}

impl<B: BlobStore, S: KvStore> Pipeline<B, S> {
    pub fn new(config: Config, blobs: B, table: S) -> Self {
        Pipeline { config, blobs, table }
    }

    pub fn table(&self) -> &S {
        &self.table
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Ошибки данных отдельных рядов не делают прогон неуспешным, они
    /// попадают в `errors` блоба. `Failed` означает сбой ввода или записи;
    /// `Err` только если не удалось записать даже блоб с ошибкой.
    pub fn run(&mut self, event: &RunEvent, execution_time: DateTime<Utc>) -> Result<RunOutcome> {
        info!(run_id = %event.run_id, series_group_id = %event.series_group_id, "run started");

        if let Some(upstream) = event.errors.as_ref().filter(|e| !is_empty_errors(e)) {
            return self.fail(event, execution_time, "upstream step reported errors", Some(upstream), None);
        }

        match self.process(event, execution_time) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(run_id = %event.run_id, error = %e, "run failed");
                self.fail(event, execution_time, &e.to_string(), None, None)
            }
        }
    }

    fn process(&mut self, event: &RunEvent, execution_time: DateTime<Utc>) -> Result<RunOutcome> {
        let original = self.read_rows(&event.bucket_name, &self.config.original_key)?;
        let sa = self.read_rows(&event.bucket_name, &self.config.seasonally_adjusted_key)?;
        let trend = self.read_rows(&event.bucket_name, &self.config.trend_key)?;

        let models = TableModelSource::new(&self.table, &self.config.model_attribute)
            .resolve(&event.series_group_id)?;

        let ctx = RunContext {
            series_group_id: event.series_group_id.clone(),
            run_id: event.run_id.clone(),
            execution_time,
            workspace_id: event.workspace_id.clone(),
        };
        let mut batch = assemble_batch(&original, &sa, &trend, &ctx, &models);

        let object_key = object_key(&event.output_prefix, &format!("{}_{}.json", ctx.series_group_id, ctx.run_id));

        let report = match TableSink::new(&mut self.table).write_batch(&batch.series_list) {
            Ok(report) => report,
            Err(e) => {
                // записи не сохранены, но батч и список ошибок должны дойти до блоба
                error!(run_id = %ctx.run_id, error = %e, "table write failed");
                let message = e.to_string();
                for (index, record) in batch.series_list.iter().enumerate() {
                    batch.errors.push(SeriesFailure {
                        index,
                        series_id: Some(record.series_id.clone()),
                        kind: FailureKind::SinkWrite,
                        message: message.clone(),
                    });
                }
                if let Err(put_err) = self.put_batch(&event.bucket_name, &object_key, &batch) {
                    error!(object_key = %object_key, error = %put_err, "batch blob not written");
                }
                return self.fail(event, execution_time, &message, None, Some(&batch));
            }
        };
        for key in report.failed {
            let index = batch
                .series_list
                .iter()
                .position(|r| r.series_id == key.series_id)
                .unwrap_or_default();
            batch.errors.push(SeriesFailure {
                index,
                series_id: Some(key.series_id),
                kind: FailureKind::SinkWrite,
                message: "record was not written to the table".into(),
            });
        }

        self.put_batch(&event.bucket_name, &object_key, &batch)?;

        info!(
            records = batch.series_list.len(),
            errors = batch.errors.len(),
            object_key = %object_key,
            "run finished"
        );
        Ok(summary(&event.bucket_name, object_key, &batch))
    }

    fn put_batch(&self, bucket: &str, key: &str, batch: &SeriesBatch) -> Result<()> {
        self.blobs.put(bucket, key, &serde_json::to_vec(batch)?)
    }

    fn read_rows(&self, bucket: &str, key: &str) -> Result<Vec<Result<TabularRow>>> {
        let bytes = self.blobs.get(bucket, key)?;
        let rows = SeriesCsv::read_rows(bytes.as_slice())?;
        info!(key, rows = rows.len(), "input read");
        Ok(rows)
    }

    fn fail(
        &self,
        event: &RunEvent,
        execution_time: DateTime<Utc>,
        message: &str,
        upstream: Option<&Value>,
        batch: Option<&SeriesBatch>,
    ) -> Result<RunOutcome> {
        let report = ErrorReport {
            series_group_id: &event.series_group_id,
            run_id: &event.run_id,
            execution_time,
            message,
            errors: upstream,
            batch,
        };
        let error_key = object_key(
            &event.output_prefix,
            &format!("errors/{}_{}.json", event.series_group_id, event.run_id),
        );
        self.blobs
            .put(&event.bucket_name, &error_key, &serde_json::to_vec(&report)?)?;
        Ok(RunOutcome::Failed {
            bucket_name: event.bucket_name.clone(),
            error_key,
            message: message.to_string(),
        })
    }
}

fn summary(bucket: &str, object_key: String, batch: &SeriesBatch) -> RunOutcome {
    RunOutcome::Succeeded {
        bucket_name: bucket.to_string(),
        object_key,
        record_count: batch.series_list.len(),
        error_count: batch.errors.len(),
    }
}

fn is_empty_errors(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn object_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_keys_ignore_stray_slashes() {
        assert_eq!(object_key("", "a.json"), "a.json");
        assert_eq!(object_key("/out/", "a.json"), "out/a.json");
        assert_eq!(object_key("out/run", "errors/a.json"), "out/run/errors/a.json");
    }

    #[test]
    fn empty_upstream_errors_do_not_fail_the_run() {
        assert!(is_empty_errors(&json!(null)));
        assert!(is_empty_errors(&json!([])));
        assert!(is_empty_errors(&json!({})));
        assert!(!is_empty_errors(&json!(["boom"])));
        assert!(!is_empty_errors(&json!({"Error": "States.TaskFailed"})));
    }
}
