//! Трэйты-границы: поиск модели декомпозиции и хранилища.

use crate::{
    error::Result,
    model::{DecompositionModel, SeriesRecord, TabularRow},
    store::kv::{AttributeUpdate, BatchPutReport, Item, ItemKey},
};
use std::collections::HashMap;
use std::io::{BufRead, Write};

/// Чтение строк рядов. Внешний `Result` означает сбой источника целиком,
/// внутренний означает ошибку разбора конкретной строки.
pub trait ReadRows {
    fn read_rows<R: BufRead>(r: R) -> Result<Vec<Result<TabularRow>>>;
}

pub trait WriteRows {
    fn write_rows<W: Write>(w: W, rows: &[TabularRow]) -> Result<()>;
}

/// Модель декомпозиции для ряда; `None`, если записи нет (тогда Additive).
pub trait ModelLookup {
    fn model_for(&self, series_id: &str) -> Option<DecompositionModel>;
}

impl ModelLookup for HashMap<String, DecompositionModel> {
    fn model_for(&self, series_id: &str) -> Option<DecompositionModel> {
        self.get(series_id).copied()
    }
}

/// Пустой справочник: все ряды аддитивные.
pub struct NoModels;

impl ModelLookup for NoModels {
    fn model_for(&self, _series_id: &str) -> Option<DecompositionModel> {
        None
    }
}

/// Источник справочника моделей для группы рядов.
pub trait ModelSource {
    fn resolve(&self, series_group_id: &str) -> Result<HashMap<String, DecompositionModel>>;
}

/// Объектное хранилище: байты по (bucket, key).
pub trait BlobStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Таблица «ключ-документ» с составным ключом (SeriesGroupID, SeriesID).
pub trait KvStore {
    fn get(&self, key: &ItemKey) -> Result<Option<Item>>;

    /// Идемпотентный upsert: атрибуты из `items` перекрывают существующие,
    /// прочие атрибуты записи остаются. Незаписанные ключи попадают в отчёт.
    fn put_batch(&mut self, items: Vec<(ItemKey, Item)>) -> Result<BatchPutReport>;

    /// `SET` атрибутов существующей записи; возвращает новые значения.
    fn update_if_exists(&mut self, key: &ItemKey, updates: &[AttributeUpdate]) -> Result<Item>;

    fn query_group(&self, series_group_id: &str) -> Result<Vec<Item>>;
}

pub trait RecordSink {
    fn write_batch(&mut self, records: &[SeriesRecord]) -> Result<BatchPutReport>;
}
