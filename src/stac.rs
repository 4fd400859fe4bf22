//! STAC document types and the item/collection builders.
//!
//! The documents are plain serde structs rather than bindings to a STAC
//! library: the fields HRRR items need are fixed and small, and keeping
//! them explicit makes the serialized output part of the crate's contract.

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;

use crate::cycle::{self, ForecastCycleType, region_config};
use crate::errors::{BuildError, ValidationError};
use crate::inventory::{GribLayer, RetryConfig, extract_layers};
use crate::locator::{self, AssetLocation, GRIB2_MEDIA_TYPE, INDEX_MEDIA_TYPE};
use crate::model::{AssetRole, CloudProvider, ForecastRunKey, Product, Region};
use crate::services::metadata_api::GribMetadataApi;

pub const STAC_VERSION: &str = "1.0.0";
pub const COLLECTION_ID_BASE: &str = "noaa-hrrr";
pub const FORECAST_EXTENSION: &str =
    "https://stac-extensions.github.io/forecast/v0.2.0/schema.json";
pub const ITEM_ASSETS_EXTENSION: &str =
    "https://stac-extensions.github.io/item-assets/v1.0.0/schema.json";

/// Collection id for one (region, product) pair, e.g. `noaa-hrrr-conus-sfc`.
pub fn collection_id(region: Region, product: Product) -> String {
    format!("{COLLECTION_ID_BASE}-{region}-{product}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProperties {
    /// The forecasted instant: reference datetime plus horizon.
    pub datetime: DateTime<Utc>,
    #[serde(rename = "forecast:reference_datetime")]
    pub reference_datetime: DateTime<Utc>,
    /// ISO-8601 duration, e.g. `PT10H`.
    #[serde(rename = "forecast:horizon")]
    pub horizon: String,
    #[serde(rename = "noaa-hrrr:forecast_cycle_type")]
    pub forecast_cycle_type: ForecastCycleType,
    #[serde(rename = "noaa-hrrr:region")]
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAsset {
    pub href: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub title: String,
    pub roles: Vec<String>,
    /// Bands in file order; present on the GRIB asset only.
    #[serde(rename = "grib:layers", skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<GribLayer>>,
}

/// Links an item back to its collection document.
///
/// The documents are published relatively (items next to their
/// collection), so the hrefs stay valid wherever the set is copied.
fn collection_links() -> Vec<Link> {
    ["collection", "parent", "root"]
        .iter()
        .map(|rel| Link {
            rel: rel.to_string(),
            href: "./collection.json".to_string(),
            media_type: Some("application/json".to_string()),
            title: None,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub stac_version: String,
    pub stac_extensions: Vec<String>,
    pub id: String,
    pub collection: String,
    pub geometry: serde_json::Value,
    pub bbox: [f64; 4],
    pub properties: ItemProperties,
    pub assets: BTreeMap<String, ItemAsset>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastItemCollection {
    #[serde(rename = "type")]
    pub collection_type: String,
    pub features: Vec<ForecastItem>,
}

impl ForecastItemCollection {
    pub fn new(features: Vec<ForecastItem>) -> Self {
        Self {
            collection_type: "FeatureCollection".to_string(),
            features,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub roles: Vec<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub bbox: Vec<[f64; 4]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalExtent {
    pub interval: Vec<[Option<DateTime<Utc>>; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub spatial: SpatialExtent,
    pub temporal: TemporalExtent,
}

/// Item-assets extension entry: the shape an asset takes on every item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDefinition {
    #[serde(rename = "type")]
    pub media_type: String,
    pub roles: Vec<String>,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCollection {
    #[serde(rename = "type")]
    pub collection_type: String,
    pub stac_version: String,
    pub stac_extensions: Vec<String>,
    pub id: String,
    pub title: String,
    pub description: String,
    pub license: String,
    pub keywords: Vec<String>,
    pub providers: Vec<Provider>,
    pub extent: Extent,
    pub links: Vec<Link>,
    pub item_assets: BTreeMap<String, AssetDefinition>,
}

fn grib_asset_description(product: Product) -> String {
    format!(
        "{} forecast data as a grib2 file. Subsets of the data can be loaded \
         using the byte ranges in the index asset.",
        product.title()
    )
}

fn asset_definitions(product: Product) -> BTreeMap<String, AssetDefinition> {
    let mut definitions = BTreeMap::new();
    definitions.insert(
        AssetRole::Grib.as_str().to_string(),
        AssetDefinition {
            media_type: GRIB2_MEDIA_TYPE.to_string(),
            roles: vec!["data".to_string()],
            title: product.title().to_string(),
            description: grib_asset_description(product),
        },
    );
    definitions.insert(
        AssetRole::Index.as_str().to_string(),
        AssetDefinition {
            media_type: INDEX_MEDIA_TYPE.to_string(),
            roles: vec!["metadata".to_string()],
            title: "GRIB2 byte-offset index".to_string(),
            description: "Plain-text sidecar listing each band's variable, level, \
                          and byte offset within the GRIB2 file."
                .to_string(),
        },
    );
    definitions
}

fn item_asset(location: &AssetLocation, product: Product, layers: &[GribLayer]) -> ItemAsset {
    match location.role {
        AssetRole::Grib => ItemAsset {
            href: location.href.clone(),
            media_type: location.media_type.to_string(),
            title: product.title().to_string(),
            roles: vec!["data".to_string()],
            layers: Some(layers.to_vec()),
        },
        AssetRole::Index => ItemAsset {
            href: location.href.clone(),
            media_type: location.media_type.to_string(),
            title: "GRIB2 byte-offset index".to_string(),
            roles: vec!["metadata".to_string()],
            layers: None,
        },
    }
}

/// Builds the STAC item for one forecast run/hour.
///
/// Validation, asset resolution, and layer extraction must all succeed
/// before an item exists; any failure aborts the whole build with the run
/// key attached. Partial items are never produced.
#[instrument(skip(api, retry), fields(item_id = %key.item_id()))]
pub async fn build_item<M: GribMetadataApi + ?Sized>(
    api: &M,
    key: &ForecastRunKey,
    retry: &RetryConfig,
) -> Result<ForecastItem, BuildError> {
    cycle::validate(key).map_err(|e| BuildError::new(*key, e))?;
    let locations = locator::locate(key).map_err(|e| BuildError::new(*key, e))?;

    // the layer table comes from the index sidecar, once per item
    let index_location = locations
        .iter()
        .find(|l| l.role == AssetRole::Index)
        .expect("locate always yields an index asset");
    let layers = extract_layers(api, index_location, retry)
        .await
        .map_err(|e| BuildError::new(*key, e))?;

    let config = region_config(key.region);
    let cycle_type = cycle::classify_cycle(key.region, key.reference_datetime.hour());

    let assets = locations
        .iter()
        .map(|location| {
            (
                location.role.as_str().to_string(),
                item_asset(location, key.product, &layers),
            )
        })
        .collect();

    Ok(ForecastItem {
        item_type: "Feature".to_string(),
        stac_version: STAC_VERSION.to_string(),
        stac_extensions: vec![FORECAST_EXTENSION.to_string()],
        id: key.item_id(),
        collection: collection_id(key.region, key.product),
        geometry: config.geometry(),
        bbox: config.bbox,
        properties: ItemProperties {
            datetime: key.forecast_datetime(),
            reference_datetime: key.reference_datetime,
            horizon: format!("PT{}H", key.forecast_hour),
            forecast_cycle_type: cycle_type,
            region: key.region,
        },
        assets,
        links: collection_links(),
    })
}

/// Builds the static STAC collection for a (region, product) pair.
///
/// Pure assembly from the configuration tables; the provider only
/// contributes the temporal extent's start (archives begin on different
/// dates). Combinations the archive never publishes are rejected rather
/// than described.
pub fn build_collection(
    region: Region,
    product: Product,
    cloud_provider: CloudProvider,
) -> Result<ForecastCollection, ValidationError> {
    let config = region_config(region);
    if !config.supports(product) {
        return Err(ValidationError::UnsupportedProduct { region, product });
    }
    let start = locator::archive_start_date(cloud_provider)
        .map(|date| date.and_time(NaiveTime::MIN).and_utc());

    Ok(ForecastCollection {
        collection_type: "Collection".to_string(),
        stac_version: STAC_VERSION.to_string(),
        stac_extensions: vec![ITEM_ASSETS_EXTENSION.to_string()],
        id: collection_id(region, product),
        title: format!(
            "NOAA High Resolution Rapid Refresh (HRRR) - {} - {}",
            region, product.title()
        ),
        description: "The NOAA HRRR is a real-time 3km resolution, hourly updated, \
                      cloud-resolving, convection-allowing atmospheric model, \
                      initialized by 3km grids with 3km radar assimilation. Radar data \
                      is assimilated in the HRRR every 15 min over a 1-hour period \
                      adding further detail to that provided by the hourly data \
                      assimilation from the 13km radar-enhanced Rapid Refresh (RAP) \
                      system."
            .to_string(),
        license: "CC-BY-4.0".to_string(),
        keywords: ["NOAA", "HRRR", "forecast", "atmospheric", "weather"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        providers: vec![Provider {
            name: "NOAA".to_string(),
            roles: vec!["producer".to_string()],
            url: "https://www.noaa.gov/".to_string(),
        }],
        extent: Extent {
            spatial: SpatialExtent {
                bbox: vec![config.bbox],
            },
            temporal: TemporalExtent {
                interval: vec![[start, None]],
            },
        },
        links: vec![
            Link {
                rel: "license".to_string(),
                href: "https://creativecommons.org/licenses/by/4.0/".to_string(),
                media_type: Some("text/html".to_string()),
                title: Some("CC-BY-4.0 license".to_string()),
            },
            Link {
                rel: "documentation".to_string(),
                href: "https://rapidrefresh.noaa.gov/hrrr/".to_string(),
                media_type: Some("text/html".to_string()),
                title: Some("NOAA HRRR documentation".to_string()),
            },
        ],
        item_assets: asset_definitions(product),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BuildErrorKind;
    use crate::errors::ValidationError;
    use crate::services::metadata_api::LayerDescriptor;
    use chrono::TimeZone;

    /// Serves the same three bands for every asset.
    struct StubApi;

    #[async_trait::async_trait]
    impl GribMetadataApi for StubApi {
        async fn layer_descriptors(
            &self,
            _location: &AssetLocation,
        ) -> Result<Vec<LayerDescriptor>, crate::errors::FetchError> {
            Ok(vec![
                LayerDescriptor {
                    message_number: 2,
                    byte_offset: 375155,
                    variable: "RETOP".to_string(),
                    level: "cloud top".to_string(),
                    forecast: "10 hour fcst".to_string(),
                },
                LayerDescriptor {
                    message_number: 1,
                    byte_offset: 0,
                    variable: "REFC".to_string(),
                    level: "entire atmosphere".to_string(),
                    forecast: "10 hour fcst".to_string(),
                },
                LayerDescriptor {
                    message_number: 3,
                    byte_offset: 667908,
                    variable: "TMP".to_string(),
                    level: "2 m above ground".to_string(),
                    forecast: "10 hour fcst".to_string(),
                },
            ])
        }
    }

    fn key() -> ForecastRunKey {
        ForecastRunKey {
            region: Region::Conus,
            product: Product::Surface,
            cloud_provider: CloudProvider::Azure,
            reference_datetime: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            forecast_hour: 10,
        }
    }

    #[tokio::test]
    async fn test_build_item_assembles_forecast_fields() {
        let item = build_item(&StubApi, &key(), &RetryConfig::default())
            .await
            .unwrap();

        assert_eq!(item.id, "hrrr-conus-sfc-2024-05-01T12-FH10");
        assert_eq!(item.collection, "noaa-hrrr-conus-sfc");
        assert_eq!(
            item.properties.datetime,
            Utc.with_ymd_and_hms(2024, 5, 1, 22, 0, 0).unwrap()
        );
        assert_eq!(item.properties.horizon, "PT10H");
        assert_eq!(item.properties.region, Region::Conus);
        assert_eq!(
            item.properties.forecast_cycle_type,
            ForecastCycleType::Extended
        );
    }

    #[tokio::test]
    async fn test_build_item_layers_in_band_order_on_grib_asset() {
        let item = build_item(&StubApi, &key(), &RetryConfig::default())
            .await
            .unwrap();

        let grib = &item.assets["grib"];
        let layers = grib.layers.as_ref().unwrap();
        assert_eq!(layers.len(), 3);
        let bands: Vec<u32> = layers.iter().map(|l| l.band_index).collect();
        assert_eq!(bands, vec![1, 2, 3]);
        assert_eq!(layers[2].units.as_deref(), Some("K"));

        let index = &item.assets["index"];
        assert!(index.layers.is_none());
        assert!(index.href.ends_with(".idx"));
    }

    #[tokio::test]
    async fn test_build_item_rejects_invalid_run_without_fetching() {
        let mut k = key();
        k.region = Region::Alaska;
        k.product = Product::SubHourly;
        let err = build_item(&StubApi, &k, &RetryConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.key, k);
        assert!(matches!(
            err.kind,
            BuildErrorKind::Validation(ValidationError::UnsupportedProduct { .. })
        ));
    }

    #[tokio::test]
    async fn test_item_json_round_trip() {
        let item = build_item(&StubApi, &key(), &RetryConfig::default())
            .await
            .unwrap();
        let json = serde_json::to_string_pretty(&item).unwrap();
        let parsed: ForecastItem = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, item);

        // custom property names survive serialization
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["properties"]["noaa-hrrr:region"], "conus");
        assert_eq!(
            value["properties"]["noaa-hrrr:forecast_cycle_type"],
            "extended"
        );
        assert_eq!(value["properties"]["datetime"], "2024-05-01T22:00:00Z");
        assert!(value["assets"]["grib"]["grib:layers"].is_array());
    }

    #[tokio::test]
    async fn test_item_links_reference_the_collection() {
        let item = build_item(&StubApi, &key(), &RetryConfig::default())
            .await
            .unwrap();
        let rels: Vec<&str> = item.links.iter().map(|l| l.rel.as_str()).collect();
        assert!(rels.contains(&"collection"));
        assert!(rels.contains(&"parent"));
        assert!(rels.contains(&"root"));
        assert!(item.links.iter().all(|l| l.href == "./collection.json"));
    }

    #[test]
    fn test_collection_rejects_unsupported_product() {
        let err = build_collection(Region::Alaska, Product::SubHourly, CloudProvider::Azure)
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnsupportedProduct {
                region: Region::Alaska,
                product: Product::SubHourly,
            }
        ));
    }

    #[test]
    fn test_collection_round_trip_and_extents() {
        let collection =
            build_collection(Region::Conus, Product::Surface, CloudProvider::Azure).unwrap();
        assert_eq!(collection.id, "noaa-hrrr-conus-sfc");
        assert_eq!(collection.license, "CC-BY-4.0");
        assert_eq!(collection.extent.spatial.bbox.len(), 1);
        assert_eq!(
            collection.extent.temporal.interval[0][0],
            Some(Utc.with_ymd_and_hms(2021, 3, 21, 0, 0, 0).unwrap())
        );
        assert_eq!(collection.extent.temporal.interval[0][1], None);
        assert!(collection.item_assets.contains_key("grib"));
        assert!(collection.item_assets.contains_key("index"));

        let json = serde_json::to_string(&collection).unwrap();
        let parsed: ForecastCollection = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, collection);
    }

    #[test]
    fn test_collection_temporal_start_differs_by_provider() {
        let aws = build_collection(Region::Conus, Product::Surface, CloudProvider::Aws).unwrap();
        assert_eq!(
            aws.extent.temporal.interval[0][0],
            Some(Utc.with_ymd_and_hms(2014, 7, 30, 0, 0, 0).unwrap())
        );
    }
}
