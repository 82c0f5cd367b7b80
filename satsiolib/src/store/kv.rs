//! Локальная таблица «ключ-документ»: JSON-файл со всеми записями.
//!
//! Ключ составной: `SeriesGroupID` + `SeriesID`, оба атрибута хранятся внутри записи.
//! Каждое изменение переписывает файл целиком (через временный файл и rename).

use crate::{
    error::{Result, SatsError},
    traits::KvStore,
};
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};
use tracing::debug;

pub const PARTITION_KEY: &str = "SeriesGroupID";
pub const SORT_KEY: &str = "SeriesID";

pub type Item = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemKey {
    pub series_group_id: String,
    pub series_id: String,
}

impl ItemKey {
    pub fn new(series_group_id: impl Into<String>, series_id: impl Into<String>) -> Self {
        ItemKey {
            series_group_id: series_group_id.into(),
            series_id: series_id.into(),
        }
    }

    fn from_item(item: &Item) -> Result<Self> {
        let attr = |name: &str| {
            item.get(name)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| SatsError::Parse(format!("stored item without string attribute {name}")))
        };
        Ok(ItemKey::new(attr(PARTITION_KEY)?, attr(SORT_KEY)?))
    }

    fn is_valid(&self) -> bool {
        !self.series_group_id.is_empty() && !self.series_id.is_empty()
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.series_group_id, self.series_id)
    }
}

/// `SET path = value`, путь через точку: `KeyParam.UnfrozenSpan.LengthDesired`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeUpdate {
    pub path: String,
    pub value: Value,
}

impl AttributeUpdate {
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        AttributeUpdate {
            path: path.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPutReport {
    pub written: usize,
    pub failed: Vec<ItemKey>,
}

impl BatchPutReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct LocalTable {
    path: PathBuf,
    items: BTreeMap<ItemKey, Item>,
}

impl LocalTable {
    /// Открывает таблицу; отсутствующий файл означает пустую таблицу.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut items = BTreeMap::new();
        if path.exists() {
            let stored: Vec<Item> = serde_json::from_slice(&fs::read(&path)?)?;
            for item in stored {
                items.insert(ItemKey::from_item(&item)?, item);
            }
        }
        debug!(path = %path.display(), items = items.len(), "opened table");
        Ok(LocalTable { path, items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn persist(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let items: Vec<&Item> = self.items.values().collect();
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&items)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Применяет изменение; при ошибке записи файла состояние откатывается.
    fn commit<T>(&mut self, change: impl FnOnce(&mut BTreeMap<ItemKey, Item>) -> Result<T>) -> Result<T> {
        let snapshot = self.items.clone();
        let out = change(&mut self.items).and_then(|out| self.persist().map(|_| out));
        if out.is_err() {
            self.items = snapshot;
        }
        out
    }
}

impl KvStore for LocalTable {
    fn get(&self, key: &ItemKey) -> Result<Option<Item>> {
        Ok(self.items.get(key).cloned())
    }

    fn put_batch(&mut self, items: Vec<(ItemKey, Item)>) -> Result<BatchPutReport> {
        self.commit(|table| {
            let mut report = BatchPutReport::default();
            for (key, mut item) in items {
                if !key.is_valid() {
                    report.failed.push(key);
                    continue;
                }
                item.insert(PARTITION_KEY.into(), Value::String(key.series_group_id.clone()));
                item.insert(SORT_KEY.into(), Value::String(key.series_id.clone()));
                // атрибуты верхнего уровня заменяются, остальные (KeyParam) сохраняются
                table.entry(key).or_default().extend(item);
                report.written += 1;
            }
            Ok(report)
        })
    }

    fn update_if_exists(&mut self, key: &ItemKey, updates: &[AttributeUpdate]) -> Result<Item> {
        if updates.is_empty() {
            return Err(SatsError::NothingToUpdate);
        }
        self.commit(|table| {
            let item = table
                .get_mut(key)
                .ok_or_else(|| SatsError::ConditionalCheckFailed(key.to_string()))?;
            let mut updated = Item::new();
            for u in updates {
                let path = split_path(&u.path)?;
                set_path(item, &path, u.value.clone())?;
                set_path(&mut updated, &path, u.value.clone())?;
            }
            Ok(updated)
        })
    }

    fn query_group(&self, series_group_id: &str) -> Result<Vec<Item>> {
        Ok(self
            .items
            .iter()
            .filter(|(k, _)| k.series_group_id == series_group_id)
            .map(|(_, v)| v.clone())
            .collect())
    }
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(SatsError::Parse(format!("bad attribute path {path:?}")));
    }
    if parts.len() == 1 && (parts[0] == PARTITION_KEY || parts[0] == SORT_KEY) {
        return Err(SatsError::Parse(format!("key attribute {path} cannot be updated")));
    }
    Ok(parts)
}

/// Промежуточные map создаются при необходимости.
fn set_path(target: &mut Item, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        return Err(SatsError::Parse("empty attribute path".into()));
    };
    let mut node = target;
    for name in parents {
        let next = node
            .entry(name.to_string())
            .or_insert_with(|| Value::Object(Item::new()));
        node = next
            .as_object_mut()
            .ok_or_else(|| SatsError::Parse(format!("attribute {name} is not a map")))?;
    }
    node.insert(last.to_string(), value);
    Ok(())
}

/// Получение значения по пути через точку.
pub fn get_path<'a>(item: &'a Item, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut value = item.get(parts.next()?)?;
    for name in parts {
        value = value.as_object()?.get(name)?;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_path_creates_intermediate_maps() {
        let mut item = Item::new();
        set_path(&mut item, &["KeyParam", "UnfrozenSpan", "LengthDesired"], json!(10)).unwrap();
        assert_eq!(Value::Object(item), json!({"KeyParam": {"UnfrozenSpan": {"LengthDesired": 10}}}));
    }

    #[test]
    fn set_path_refuses_to_descend_into_scalars() {
        let mut item = json!({"KeyParam": 5}).as_object().cloned().unwrap();
        assert!(set_path(&mut item, &["KeyParam", "UnfrozenSpan"], json!(1)).is_err());
    }

    #[test]
    fn key_attributes_are_not_updatable() {
        assert!(split_path(SORT_KEY).is_err());
        assert!(split_path("a..b").is_err());
        assert_eq!(split_path("a.b").unwrap(), vec!["a", "b"]);
    }
}
