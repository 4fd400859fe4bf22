//! Range assembly: one STAC item per valid (run, forecast hour) pair
//! across a reference-date range.
//!
//! Builds run concurrently under a semaphore bound, but the output order
//! is structural: join handles are awaited in enumeration order
//! (reference datetime ascending, then forecast hour ascending), so the
//! assembled collection never depends on completion order.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, info, warn};

use crate::cycle::{classify_cycle, max_forecast_hour, region_config};
use crate::errors::{BuildError, ValidationError};
use crate::inventory::RetryConfig;
use crate::locator;
use crate::model::{CloudProvider, ForecastRunKey, Product, Region};
use crate::services::metadata_api::GribMetadataApi;
use crate::stac::{ForecastItemCollection, build_item};

/// One failed run, flattened for the CSV failure report.
#[derive(Debug, Clone, Serialize)]
pub struct RunFailure {
    pub region: Region,
    pub product: Product,
    pub cloud_provider: CloudProvider,
    pub reference_datetime: DateTime<Utc>,
    pub forecast_hour: u32,
    pub category: String,
    pub message: String,
}

impl RunFailure {
    fn from_error(error: &BuildError) -> Self {
        Self {
            region: error.key.region,
            product: error.key.product,
            cloud_provider: error.key.cloud_provider,
            reference_datetime: error.key.reference_datetime,
            forecast_hour: error.key.forecast_hour,
            category: error.category().to_string(),
            message: error.kind.to_string(),
        }
    }
}

/// The assembled collection plus everything that did not make it in.
#[derive(Debug)]
pub struct Assembly {
    pub items: ForecastItemCollection,
    pub failures: Vec<RunFailure>,
}

/// Every (run, forecast hour) pair in `[start_date, end_date]`, in
/// enumeration order.
pub fn enumerate_runs(
    region: Region,
    product: Product,
    cloud_provider: CloudProvider,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Vec<ForecastRunKey> {
    let config = region_config(region);
    let mut runs = Vec::new();

    let mut date = start_date;
    while date <= end_date {
        for hour in config.cycle_run_hours() {
            let reference_datetime = date
                .and_time(NaiveTime::MIN)
                .and_utc()
                + chrono::Duration::hours(i64::from(hour));
            let cycle_type = classify_cycle(region, hour);
            for forecast_hour in 0..=max_forecast_hour(region, product, cycle_type) {
                runs.push(ForecastRunKey {
                    region,
                    product,
                    cloud_provider,
                    reference_datetime,
                    forecast_hour,
                });
            }
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    runs
}

/// Assembles the item collection for a reference-date range.
///
/// Combinations that are invalid for the whole range (unregistered
/// product or provider) fail fast; anything per-run (missing objects,
/// transient faults) is recorded in the failure report and enumeration
/// continues. Callers always receive both halves, never a silent subset.
#[tracing::instrument(skip(api, retry), fields(%region, %product, %cloud_provider, %start_date, %end_date))]
pub async fn assemble(
    api: Arc<dyn GribMetadataApi>,
    region: Region,
    product: Product,
    cloud_provider: CloudProvider,
    start_date: NaiveDate,
    end_date: NaiveDate,
    concurrency: usize,
    retry: RetryConfig,
) -> Result<Assembly, ValidationError> {
    if !region_config(region).supports(product) {
        return Err(ValidationError::UnsupportedProduct { region, product });
    }
    if !locator::has_template(cloud_provider) {
        return Err(ValidationError::UnsupportedCloudProvider {
            provider: cloud_provider,
        });
    }

    let runs = enumerate_runs(region, product, cloud_provider, start_date, end_date);
    info!(run_count = runs.len(), concurrency, "Assembling item collection");

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = Vec::with_capacity(runs.len());

    for key in runs {
        let api = api.clone();
        let semaphore = semaphore.clone();
        let retry = retry.clone();
        let span = tracing::info_span!("build_run", item_id = %key.item_id());

        tasks.push(tokio::spawn(
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("assembly semaphore closed");
                build_item(api.as_ref(), &key, &retry).await
            }
            .instrument(span),
        ));
    }

    let mut items = Vec::new();
    let mut failures = Vec::new();

    // awaiting in spawn order keeps the output in enumeration order
    for task in tasks {
        match task.await.expect("item build task panicked") {
            Ok(item) => items.push(item),
            Err(error) => {
                warn!(error = %error, "Run skipped");
                failures.push(RunFailure::from_error(&error));
            }
        }
    }

    info!(
        item_count = items.len(),
        failure_count = failures.len(),
        "Assembly finished"
    );

    Ok(Assembly {
        items: ForecastItemCollection::new(items),
        failures,
    })
}
