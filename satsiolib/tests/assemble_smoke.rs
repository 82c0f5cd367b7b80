use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use satsiolib::{
    assemble::{assemble, assemble_batch},
    error::SatsError,
    model::{DecompositionModel, FailureKind, Periodicity, RunContext, TabularRow},
    traits::NoModels,
};
use std::collections::HashMap;

fn dec(s: &str) -> Decimal {
    Decimal::from_str_exact(s).unwrap()
}

fn ctx() -> RunContext {
    RunContext {
        series_group_id: "TEST_01".into(),
        run_id: "run-1".into(),
        execution_time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        workspace_id: Some("ws-1".into()),
    }
}

/// 24 значения, начиная с `first`, шаг 1.25
fn row(id: &str, first: &str) -> TabularRow {
    let start = dec(first);
    TabularRow {
        series_id: id.into(),
        periodicity: Periodicity::Monthly,
        start_year: 2001,
        start_month: 3,
        value_count: 24,
        values: (0..24).map(|i| start + Decimal::new(125, 2) * Decimal::from(i)).collect(),
    }
}

#[test]
fn additive_factor_is_original_minus_sa() {
    let rec = assemble(0, &row("ABC", "54.32"), &row("ABC", "55.32"), &row("ABC", "56.32"), &ctx(), &NoModels)
        .expect("assemble");

    assert_eq!(rec.series_id, "ABC");
    assert_eq!(rec.series_group_id, "TEST_01");
    assert_eq!(rec.decomposition_model, DecompositionModel::Additive);
    assert_eq!(rec.original.len(), 24);
    assert_eq!(rec.adjustment_factor.len(), 24);

    let first = &rec.adjustment_factor[0];
    assert_eq!(first.date, NaiveDate::from_ymd_opt(2001, 3, 1).unwrap());
    assert_eq!(first.value.to_string(), "-1.00");

    // все четыре ряда на одной оси дат
    for (i, o) in rec.original.iter().enumerate() {
        assert_eq!(o.date, rec.seasonally_adjusted[i].date);
        assert_eq!(o.date, rec.trend[i].date);
        assert_eq!(o.date, rec.adjustment_factor[i].date);
        assert_eq!(o.value - rec.adjustment_factor[i].value, rec.seasonally_adjusted[i].value);
    }
    assert_eq!(rec.trend[0].value, dec("56.32"));
}

#[test]
fn multiplicative_factor_is_ratio() {
    let models = HashMap::from([("ABC".to_string(), DecompositionModel::Multiplicative)]);
    let rec = assemble(0, &row("ABC", "50"), &row("ABC", "25"), &row("ABC", "30"), &ctx(), &models)
        .expect("assemble");

    assert_eq!(rec.decomposition_model, DecompositionModel::Multiplicative);
    assert_eq!(rec.adjustment_factor[0].value, Decimal::from(2));
    for (i, o) in rec.original.iter().enumerate() {
        let back = o.value / rec.adjustment_factor[i].value;
        assert_eq!(back.round_dp(10), rec.seasonally_adjusted[i].value.round_dp(10));
    }
}

#[test]
fn zero_sa_value_is_reported_for_multiplicative() {
    let models = HashMap::from([("ABC".to_string(), DecompositionModel::Multiplicative)]);
    let mut sa = row("ABC", "1");
    sa.values[2] = Decimal::ZERO;
    let err = assemble(0, &row("ABC", "1"), &sa, &row("ABC", "1"), &ctx(), &models).unwrap_err();
    match err {
        SatsError::DivisionByZero { series_id, date } => {
            assert_eq!(series_id, "ABC");
            assert_eq!(date, NaiveDate::from_ymd_opt(2001, 5, 1).unwrap());
        }
        other => panic!("unexpected error: {other}"),
    }

    // при аддитивной модели ноль в SA допустим
    assert!(assemble(0, &row("ABC", "1"), &sa, &row("ABC", "1"), &ctx(), &NoModels).is_ok());
}

#[test]
fn misaligned_rows_are_rejected() {
    let err = assemble(3, &row("ABC", "1"), &row("XYZ", "1"), &row("ABC", "1"), &ctx(), &NoModels).unwrap_err();
    assert!(matches!(err, SatsError::RowAlignment { index: 3, ref series_id, .. } if series_id == "ABC"));

    let mut trend = row("ABC", "1");
    trend.periodicity = Periodicity::Quarterly;
    let err = assemble(0, &row("ABC", "1"), &row("ABC", "1"), &trend, &ctx(), &NoModels).unwrap_err();
    assert!(err.to_string().contains("periodicity"));
}

#[test]
fn short_rows_are_insufficient_data() {
    let mut sa = row("ABC", "1");
    sa.values.truncate(10);
    let err = assemble(0, &row("ABC", "1"), &sa, &row("ABC", "1"), &ctx(), &NoModels).unwrap_err();
    assert!(matches!(
        err,
        SatsError::InsufficientData { expected: 24, found: 10, input: "seasonally adjusted", .. }
    ));
}

#[test]
fn oversized_value_count_fails_before_dates_are_built() {
    let huge = |first: &str| TabularRow {
        value_count: usize::MAX,
        ..row("ABC", first)
    };
    let err = assemble(0, &huge("1"), &huge("2"), &huge("3"), &ctx(), &NoModels).unwrap_err();
    assert!(matches!(
        err,
        SatsError::InsufficientData { expected: usize::MAX, found: 24, input: "original", .. }
    ));
}

#[test]
fn extra_values_beyond_count_are_ignored() {
    let mut orig = row("ABC", "1");
    orig.values.push(dec("999"));
    let rec = assemble(0, &orig, &row("ABC", "1"), &row("ABC", "1"), &ctx(), &NoModels).unwrap();
    assert_eq!(rec.original.len(), 24);
}

#[test]
fn assembling_twice_gives_identical_json() {
    let a = assemble(0, &row("ABC", "1.1"), &row("ABC", "2.2"), &row("ABC", "3.3"), &ctx(), &NoModels).unwrap();
    let mut later = ctx();
    later.execution_time = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    let mut b = assemble(0, &row("ABC", "1.1"), &row("ABC", "2.2"), &row("ABC", "3.3"), &later, &NoModels).unwrap();
    b.execution_time = a.execution_time;
    assert_eq!(serde_json::to_vec(&a).unwrap(), serde_json::to_vec(&b).unwrap());
}

#[test]
fn batch_isolates_failures() {
    let original = vec![
        Err(SatsError::RowParse {
            index: 0,
            series_id: Some("BAD".into()),
            reason: "periodicity: \"x\" is not an integer".into(),
        }),
        Ok(row("XYZ", "34.21")),
    ];
    let sa = vec![Ok(row("BAD", "1")), Ok(row("XYZ", "35.21"))];
    let trend = vec![Ok(row("BAD", "1")), Ok(row("XYZ", "24.00"))];

    let batch = assemble_batch(&original, &sa, &trend, &ctx(), &NoModels);
    assert_eq!(batch.series_list.len(), 1);
    assert_eq!(batch.series_list[0].series_id, "XYZ");
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].index, 0);
    assert_eq!(batch.errors[0].series_id.as_deref(), Some("BAD"));
    assert_eq!(batch.errors[0].kind, FailureKind::RowParse);
    assert_eq!(batch.workspace_id.as_deref(), Some("ws-1"));
}

#[test]
fn batch_reports_rows_missing_from_parallel_inputs() {
    let original = vec![Ok(row("ABC", "1")), Ok(row("XYZ", "1"))];
    let sa = vec![Ok(row("ABC", "1")), Ok(row("XYZ", "1")), Ok(row("EXTRA", "1"))];
    let trend = vec![Ok(row("ABC", "1"))];

    let batch = assemble_batch(&original, &sa, &trend, &ctx(), &NoModels);
    assert_eq!(batch.series_list.len(), 1);
    assert_eq!(batch.errors.len(), 2);
    assert!(batch.errors.iter().all(|e| e.kind == FailureKind::RowAlignment));
    assert_eq!(batch.errors[0].series_id.as_deref(), Some("XYZ"));
    assert_eq!(batch.errors[1].series_id.as_deref(), Some("EXTRA"));
    assert_eq!(batch.errors[1].index, 2);
}
