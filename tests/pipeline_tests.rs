//! Full-pipeline test: run key -> located assets -> layer extraction ->
//! STAC item -> serialized output, using a fixture-backed metadata service
//! instead of the network.

use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use hrrr_stac::assembler::assemble;
use hrrr_stac::errors::FetchError;
use hrrr_stac::infra::noaa::parse_idx;
use hrrr_stac::inventory::RetryConfig;
use hrrr_stac::locator::AssetLocation;
use hrrr_stac::model::{CloudProvider, ForecastRunKey, Product, Region};
use hrrr_stac::output::write_json;
use hrrr_stac::services::metadata_api::{GribMetadataApi, LayerDescriptor};
use hrrr_stac::stac::{ForecastItem, ForecastItemCollection, build_item};

const FIXTURE_IDX: &str = include_str!("fixtures/hrrr.t12z.wrfsfcf10.idx");

/// Serves the fixture index for every asset.
struct FixtureApi;

#[async_trait::async_trait]
impl GribMetadataApi for FixtureApi {
    async fn layer_descriptors(
        &self,
        location: &AssetLocation,
    ) -> Result<Vec<LayerDescriptor>, FetchError> {
        parse_idx(&location.href, FIXTURE_IDX)
    }
}

#[tokio::test]
async fn test_item_pipeline_from_fixture() {
    let key = ForecastRunKey {
        region: Region::Conus,
        product: Product::Surface,
        cloud_provider: CloudProvider::Azure,
        reference_datetime: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        forecast_hour: 10,
    };

    let item = build_item(&FixtureApi, &key, &RetryConfig::default())
        .await
        .expect("item should build from fixture metadata");

    assert_eq!(item.id, "hrrr-conus-sfc-2024-05-01T12-FH10");
    assert_eq!(
        item.properties.datetime,
        Utc.with_ymd_and_hms(2024, 5, 1, 22, 0, 0).unwrap()
    );

    let layers = item.assets["grib"].layers.as_ref().unwrap();
    assert_eq!(layers.len(), 14);
    assert_eq!(layers[0].variable, "REFC");
    assert_eq!(layers[9].variable, "TMP");
    assert_eq!(layers[9].units.as_deref(), Some("K"));
    // VIL is not in the unit table; kept verbatim, no unit
    assert_eq!(layers[2].variable, "VIL");
    assert_eq!(layers[2].units, None);

    // serialize, reparse, compare
    let json = serde_json::to_string_pretty(&item).unwrap();
    let parsed: ForecastItem = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, item);
}

#[tokio::test]
async fn test_item_collection_pipeline_writes_output() {
    let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let assembly = assemble(
        Arc::new(FixtureApi),
        Region::Alaska,
        Product::Surface,
        CloudProvider::Aws,
        start,
        start,
        4,
        RetryConfig::default(),
    )
    .await
    .unwrap();

    assert!(assembly.failures.is_empty());
    assert_eq!(assembly.items.features.len(), 4 * 49 + 4 * 19);

    let dir = std::env::temp_dir().join("hrrr_stac_pipeline_test");
    let _ = std::fs::remove_dir_all(&dir);
    let path = dir.join("items.json");
    write_json(&path, &assembly.items).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let parsed: ForecastItemCollection = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed.features.len(), assembly.items.features.len());
    assert_eq!(parsed.collection_type, "FeatureCollection");

    std::fs::remove_dir_all(&dir).unwrap();
}
