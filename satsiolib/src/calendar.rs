//! Восстановление оси дат по компактному заголовку ряда.

use crate::{
    error::{Result, SatsError},
    model::Periodicity,
};
use chrono::NaiveDate;

/// Даты наблюдений: первое число месяца, начиная с `start_year-start_month`,
/// с шагом 1 месяц (Monthly) или 3 месяца (Quarterly). Ровно `value_count` дат.
pub fn generate_dates(
    start_year: i32,
    start_month: u32,
    value_count: usize,
    periodicity: Periodicity,
) -> Result<Vec<NaiveDate>> {
    if !(1..=12).contains(&start_month) {
        return Err(SatsError::InvalidDate(format!("start month {start_month} is not in 1..=12")));
    }
    let step = i64::from(periodicity.months_per_step());
    let base = i64::from(start_month) - 1;

    (0..value_count)
        .map(|i| {
            let offset = base + step * i as i64;
            let month = (offset % 12 + 1) as u32;
            let year = i64::from(start_year) + offset / 12;
            i32::try_from(year)
                .ok()
                .and_then(|y| NaiveDate::from_ymd_opt(y, month, 1))
                .ok_or_else(|| SatsError::InvalidDate(format!("{year}-{month:02}-01 is out of range")))
        })
        .collect()
}
