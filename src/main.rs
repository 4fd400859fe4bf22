//! CLI entry point for the HRRR STAC metadata tool.
//!
//! Provides subcommands for creating a STAC collection, a single forecast
//! item, and an item collection covering a reference-date range.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use hrrr_stac::assembler::assemble;
use hrrr_stac::infra::noaa::IdxClient;
use hrrr_stac::inventory::RetryConfig;
use hrrr_stac::model::{CloudProvider, ForecastRunKey, Product, Region};
use hrrr_stac::output::{append_failures, write_json};
use hrrr_stac::stac::{build_collection, build_item};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "hrrr_stac")]
#[command(about = "Create STAC metadata for NOAA HRRR forecast assets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the STAC collection for a region/product pair
    CreateCollection {
        #[arg(value_enum)]
        region: Region,

        #[arg(value_enum)]
        product: Product,

        #[arg(value_enum)]
        cloud_provider: CloudProvider,

        /// File to write the collection JSON to
        #[arg(value_name = "DESTINATION_FILE")]
        destination: PathBuf,
    },
    /// Create the STAC item for one forecast run and hour
    CreateItem {
        #[arg(value_enum)]
        region: Region,

        #[arg(value_enum)]
        product: Product,

        #[arg(value_enum)]
        cloud_provider: CloudProvider,

        /// Model-run issuance time, e.g. 2024-05-01T12
        #[arg(value_name = "REFERENCE_DATETIME")]
        reference_datetime: String,

        /// Hours from the reference datetime to the forecast instant
        #[arg(value_name = "FORECAST_HOUR")]
        forecast_hour: u32,

        /// File to write the item JSON to
        #[arg(value_name = "DESTINATION_FILE")]
        destination: PathBuf,
    },
    /// Create an item collection over a reference-date range
    CreateItemCollection {
        #[arg(value_enum)]
        region: Region,

        #[arg(value_enum)]
        product: Product,

        #[arg(value_enum)]
        cloud_provider: CloudProvider,

        /// First reference date (inclusive), e.g. 2024-05-01
        #[arg(value_name = "START_DATE")]
        start_date: NaiveDate,

        /// Last reference date (inclusive)
        #[arg(value_name = "END_DATE")]
        end_date: NaiveDate,

        /// Folder for items.json and, on partial failure, failures.csv
        #[arg(value_name = "DESTINATION_FOLDER")]
        destination: PathBuf,

        /// Maximum number of concurrent metadata fetches
        #[arg(short, long, default_value_t = 5)]
        concurrency: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/hrrr_stac.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("hrrr_stac.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::CreateCollection {
            region,
            product,
            cloud_provider,
            destination,
        } => {
            let collection = build_collection(region, product, cloud_provider)?;
            write_json(&destination, &collection)?;
            info!(id = %collection.id, path = %destination.display(), "Collection written");
        }
        Commands::CreateItem {
            region,
            product,
            cloud_provider,
            reference_datetime,
            forecast_hour,
            destination,
        } => {
            let key = ForecastRunKey {
                region,
                product,
                cloud_provider,
                reference_datetime: parse_reference_datetime(&reference_datetime)?,
                forecast_hour,
            };
            let api = IdxClient::new()?;
            let item = build_item(&api, &key, &RetryConfig::default()).await?;
            write_json(&destination, &item)?;
            info!(id = %item.id, path = %destination.display(), "Item written");
        }
        Commands::CreateItemCollection {
            region,
            product,
            cloud_provider,
            start_date,
            end_date,
            destination,
            concurrency,
        } => {
            let api = Arc::new(IdxClient::new()?);
            let assembly = assemble(
                api,
                region,
                product,
                cloud_provider,
                start_date,
                end_date,
                concurrency,
                RetryConfig::default(),
            )
            .await?;

            write_json(&destination.join("items.json"), &assembly.items)?;
            info!(
                item_count = assembly.items.features.len(),
                path = %destination.display(),
                "Item collection written"
            );

            if !assembly.failures.is_empty() {
                let report = destination.join("failures.csv");
                append_failures(&report, &assembly.failures)?;
                error!(
                    failure_count = assembly.failures.len(),
                    report = %report.display(),
                    "Some runs failed"
                );
                anyhow::bail!(
                    "{} run(s) failed; see {}",
                    assembly.failures.len(),
                    report.display()
                );
            }
        }
    }

    Ok(())
}

/// Parses a reference datetime at hour resolution, accepting the forms
/// `2024-05-01T12`, `2024-05-01T12:00`, and `2024-05-01T12:00:00`.
fn parse_reference_datetime(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim_end_matches('Z');
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%dT%H"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed.and_utc());
        }
    }
    Err(anyhow::anyhow!("unrecognized reference datetime: {value:?}"))
        .context("expected YYYY-MM-DDTHH, e.g. 2024-05-01T12")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_reference_datetime_hour_form() {
        assert_eq!(
            parse_reference_datetime("2024-05-01T12").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_reference_datetime_full_forms() {
        for value in ["2024-05-01T12:00", "2024-05-01T12:00:00", "2024-05-01T12:00:00Z"] {
            assert_eq!(
                parse_reference_datetime(value).unwrap(),
                Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
            );
        }
    }

    #[test]
    fn test_parse_reference_datetime_keeps_sub_hour_values() {
        // validation, not parsing, rejects off-hour references
        assert_eq!(
            parse_reference_datetime("2024-05-01T12:30").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_reference_datetime_rejects_garbage() {
        assert!(parse_reference_datetime("yesterday").is_err());
        assert!(parse_reference_datetime("2024-05-01").is_err());
    }
}
