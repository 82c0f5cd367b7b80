//! satsiolib: сборка рядов (original / seasonally adjusted / trend) из CSV
//! в датированные записи, расчёт adjustment factor и запись в хранилища.

pub mod error;
pub mod model;
pub mod traits;
pub mod calendar;
pub mod assemble;
pub mod config;
pub mod pipeline;

pub mod formats {
    pub mod csv;
}

pub mod store {
    pub mod blob;
    pub mod kv;
    pub mod lookup;
    pub mod sink;
}
