use chrono::Utc;
use satsiolib::{
    assemble::assemble_batch,
    formats::csv::SeriesCsv,
    model::RunContext,
    traits::{NoModels, ReadRows},
};
use std::{fs::File, io::BufReader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Пример: series_y.csv series_sa.csv series_t.csv -> JSON батча в stdout
    let paths: Vec<String> = std::env::args().skip(1).collect();
    let [y, sa, t] = paths.as_slice() else {
        return Err("usage: assemble <series_y.csv> <series_sa.csv> <series_t.csv>".into());
    };
    let read = |p: &str| -> satsiolib::error::Result<_> { SeriesCsv::read_rows(BufReader::new(File::open(p)?)) };

    let ctx = RunContext {
        series_group_id: "TEST_01".into(),
        run_id: "local".into(),
        execution_time: Utc::now(),
        workspace_id: None,
    };
    let batch = assemble_batch(&read(y.as_str())?, &read(sa.as_str())?, &read(t.as_str())?, &ctx, &NoModels);
    serde_json::to_writer_pretty(std::io::stdout(), &batch)?;
    Ok(())
}
