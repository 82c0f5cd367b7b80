use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use satsiolib::{
    calendar::generate_dates,
    config::Config,
    error::{Result, SatsError},
    model::Periodicity,
    pipeline::{Pipeline, RunEvent},
    store::{
        blob::LocalBlobStore,
        kv::{ItemKey, LocalTable},
        lookup::DEFAULT_MODEL_ATTRIBUTE,
        sink::{update_span, UnfrozenSpan},
    },
};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "satsio", version, about = "Сборка рядов original / SA / trend в записи и JSON")]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Корень локального объектного хранилища
    #[arg(long, env = "SATSIO_STORE_ROOT", default_value = "store")]
    store_root: PathBuf,

    /// JSON-файл таблицы рядов
    #[arg(long, env = "SATSIO_TABLE", default_value = "store/series-table.json")]
    table: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Прогон: CSV → записи в таблице + JSON-блоб
    Assemble {
        /// Файл события (JSON), `-` для stdin
        #[arg(short = 'e', long = "event", default_value = "-")]
        event: String,

        #[arg(long, env = "SATSIO_ORIGINAL_KEY", default_value = "data/series_y.csv")]
        original_key: String,

        #[arg(long, env = "SATSIO_SA_KEY", default_value = "data/series_sa.csv")]
        sa_key: String,

        #[arg(long, env = "SATSIO_TREND_KEY", default_value = "data/series_t.csv")]
        trend_key: String,

        /// Атрибут записи с моделью декомпозиции
        #[arg(long, env = "SATSIO_MODEL_ATTRIBUTE", default_value = DEFAULT_MODEL_ATTRIBUTE)]
        model_attribute: String,
    },

    /// Частичное обновление KeyParam.UnfrozenSpan существующей записи
    UpdateSpan {
        #[arg(long)]
        series_group_id: String,

        #[arg(long)]
        series_id: String,

        #[arg(long)]
        length: Option<u32>,

        /// Дата YYYY-MM-DD
        #[arg(long)]
        start_date: Option<NaiveDate>,
    },

    /// Ось дат по заголовку ряда
    Dates {
        #[arg(long)]
        start_year: i32,

        #[arg(long)]
        start_month: u32,

        #[arg(long)]
        count: usize,

        /// 12 (monthly) или 4 (quarterly)
        #[arg(long, default_value_t = 12)]
        periodicity: i64,
    },
}

fn main() -> Result<ExitCode> {
    // .env необязателен
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "satsio=info,satsiolib=info".into()),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!("satsio v{} with store {}", env!("CARGO_PKG_VERSION"), cli.store.store_root.display());
    let mut out = io::stdout().lock();

    match cli.command {
        Command::Assemble {
            event,
            original_key,
            sa_key,
            trend_key,
            model_attribute,
        } => {
            let event = read_event(&event)?;
            let config = Config {
                store_root: cli.store.store_root,
                table_path: cli.store.table,
                original_key,
                seasonally_adjusted_key: sa_key,
                trend_key,
                model_attribute,
            };
            let blobs = LocalBlobStore::new(&config.store_root);
            let table = LocalTable::open(&config.table_path)?;
            let mut pipeline = Pipeline::new(config, blobs, table);

            let outcome = pipeline.run(&event, Utc::now())?;
            serde_json::to_writer_pretty(&mut out, &outcome)?;
            writeln!(out)?;
            if !outcome.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::UpdateSpan {
            series_group_id,
            series_id,
            length,
            start_date,
        } => {
            let mut table = LocalTable::open(&cli.store.table)?;
            let span = UnfrozenSpan {
                length_desired: length,
                start_date_desired: start_date,
            };
            let updated = update_span(&mut table, &ItemKey::new(series_group_id, series_id), &span)?;
            serde_json::to_writer_pretty(&mut out, &updated)?;
            writeln!(out)?;
        }
        Command::Dates {
            start_year,
            start_month,
            count,
            periodicity,
        } => {
            write_dates(&mut out, start_year, start_month, count, periodicity)?;
        }
    }

    out.flush().map_err(SatsError::from)?;
    Ok(ExitCode::SUCCESS)
}

/// Печатает ось дат, по одной дате YYYY-MM-DD в строке.
fn write_dates<W: Write>(
    out: &mut W,
    start_year: i32,
    start_month: u32,
    count: usize,
    periodicity: i64,
) -> Result<()> {
    let periodicity = Periodicity::try_from(periodicity)?;
    for d in generate_dates(start_year, start_month, count, periodicity)? {
        writeln!(out, "{}", d.format("%Y-%m-%d"))?;
    }
    Ok(())
}

fn read_event(path: &str) -> Result<RunEvent> {
    let mut buf = String::new();
    if path == "-" {
        io::stdin().read_to_string(&mut buf)?;
    } else {
        BufReader::new(File::open(path)?).read_to_string(&mut buf)?;
    }
    Ok(serde_json::from_str(&buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(periodicity: i64) -> Result<String> {
        let mut out = Vec::new();
        write_dates(&mut out, 2001, 11, 3, periodicity)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn dates_command_parses_with_monthly_default() {
        let cli = Cli::try_parse_from([
            "satsio", "--store-root", "s", "dates", "--start-year", "2001", "--start-month", "3", "--count", "2",
        ])
        .unwrap();
        assert_eq!(cli.store.store_root, PathBuf::from("s"));
        match cli.command {
            Command::Dates { count, periodicity, .. } => {
                assert_eq!(count, 2);
                assert_eq!(periodicity, 12);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn dates_are_printed_one_per_line() {
        assert_eq!(dates(12).unwrap(), "2001-11-01\n2001-12-01\n2002-01-01\n");
        assert_eq!(dates(4).unwrap(), "2001-11-01\n2002-02-01\n2002-05-01\n");
    }

    #[test]
    fn unsupported_periodicity_is_rejected() {
        assert!(matches!(dates(7), Err(SatsError::UnsupportedPeriodicity(7))));
        assert!(matches!(dates(0), Err(SatsError::UnsupportedPeriodicity(0))));
    }

    #[test]
    fn update_span_requires_keys() {
        assert!(Cli::try_parse_from(["satsio", "update-span", "--series-id", "ABC"]).is_err());
    }
}
