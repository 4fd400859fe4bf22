//! Asset resolution: run key -> canonical object URLs per cloud provider.
//!
//! Every HRRR mirror shares one object-key layout under a provider-specific
//! base URL: `hrrr.{YYYYMMDD}/{region}/hrrr.t{HH}z.wrf{product}f{FF}.grib2`
//! (Alaska inserts `.ak` before the extension) with a `.idx` byte-offset
//! sidecar next to each file. Resolution is pure string assembly; nothing
//! here checks that the object actually exists.

use chrono::{NaiveDate, Timelike};

use crate::cycle::region_config;
use crate::errors::ValidationError;
use crate::model::{AssetRole, CloudProvider, ForecastRunKey};

pub const GRIB2_MEDIA_TYPE: &str = "application/wmo-GRIB2";
pub const INDEX_MEDIA_TYPE: &str = "text/plain";

/// Resolved reference to one object in a provider's HRRR archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLocation {
    pub href: String,
    pub media_type: &'static str,
    pub role: AssetRole,
}

fn base_url(provider: CloudProvider) -> Option<&'static str> {
    match provider {
        CloudProvider::Aws => Some("https://noaa-hrrr-bdp-pds.s3.amazonaws.com"),
        CloudProvider::Azure => Some("https://noaahrrr.blob.core.windows.net/hrrr"),
        CloudProvider::Google => Some("https://storage.googleapis.com/high-resolution-rapid-refresh"),
        CloudProvider::Local => None,
    }
}

/// Whether a URL template is registered for this provider.
pub fn has_template(provider: CloudProvider) -> bool {
    base_url(provider).is_some()
}

/// First date with data in a provider's archive, for temporal extents.
pub fn archive_start_date(provider: CloudProvider) -> Option<NaiveDate> {
    match provider {
        CloudProvider::Azure => NaiveDate::from_ymd_opt(2021, 3, 21),
        CloudProvider::Aws | CloudProvider::Google => NaiveDate::from_ymd_opt(2014, 7, 30),
        CloudProvider::Local => None,
    }
}

/// Computes the GRIB2 and index locations for a run, in role order.
///
/// Deterministic; the same key always resolves to the same hrefs.
pub fn locate(key: &ForecastRunKey) -> Result<Vec<AssetLocation>, ValidationError> {
    let base = base_url(key.cloud_provider).ok_or(ValidationError::UnsupportedCloudProvider {
        provider: key.cloud_provider,
    })?;
    let config = region_config(key.region);

    let grib_href = format!(
        "{base}/hrrr.{date}/{segment}/hrrr.t{hour:02}z.wrf{product}f{forecast_hour:02}{suffix}.grib2",
        date = key.reference_datetime.format("%Y%m%d"),
        segment = config.key_segment,
        hour = key.reference_datetime.hour(),
        product = key.product,
        forecast_hour = key.forecast_hour,
        suffix = config.file_suffix,
    );
    let index_href = format!("{grib_href}.idx");

    Ok(vec![
        AssetLocation {
            href: grib_href,
            media_type: GRIB2_MEDIA_TYPE,
            role: AssetRole::Grib,
        },
        AssetLocation {
            href: index_href,
            media_type: INDEX_MEDIA_TYPE,
            role: AssetRole::Index,
        },
    ])
}
