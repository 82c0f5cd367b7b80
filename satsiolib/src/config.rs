//! Конфигурация запуска. Передаётся явно в `Pipeline::new`, глобального состояния нет.

use crate::store::lookup::DEFAULT_MODEL_ATTRIBUTE;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Корень локального объектного хранилища (bucket = подкаталог).
    pub store_root: PathBuf,
    /// JSON-файл таблицы рядов.
    pub table_path: PathBuf,
    pub original_key: String,
    pub seasonally_adjusted_key: String,
    pub trend_key: String,
    /// Путь атрибута с моделью декомпозиции в записях таблицы.
    pub model_attribute: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_root: PathBuf::from("store"),
            table_path: PathBuf::from("store/series-table.json"),
            original_key: "data/series_y.csv".into(),
            seasonally_adjusted_key: "data/series_sa.csv".into(),
            trend_key: "data/series_t.csv".into(),
            model_attribute: DEFAULT_MODEL_ATTRIBUTE.into(),
        }
    }
}
