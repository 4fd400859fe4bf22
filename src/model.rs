//! Core identity types for HRRR forecast runs.

use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// HRRR model domain.
///
/// Maps directly to the region segment of the archive object keys
/// (`hrrr.{date}/conus/...` vs `hrrr.{date}/alaska/...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Conus,
    Alaska,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Conus => "conus",
            Region::Alaska => "alaska",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HRRR model output group.
///
/// The short codes are the ones embedded in the GRIB2 file names
/// (`hrrr.t12z.wrfsfcf10.grib2` and friends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Product {
    /// 2D surface levels (`sfc`).
    #[serde(rename = "sfc")]
    #[value(name = "sfc")]
    Surface,
    /// 3D pressure levels (`prs`).
    #[serde(rename = "prs")]
    #[value(name = "prs")]
    Pressure,
    /// Native model levels (`nat`).
    #[serde(rename = "nat")]
    #[value(name = "nat")]
    Native,
    /// 2D surface levels at 15-minute intervals (`subh`).
    #[serde(rename = "subh")]
    #[value(name = "subh")]
    SubHourly,
}

impl Product {
    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Surface => "sfc",
            Product::Pressure => "prs",
            Product::Native => "nat",
            Product::SubHourly => "subh",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Product::Surface => "2D Surface Levels",
            Product::Pressure => "3D Pressure Levels",
            Product::Native => "Native Levels",
            Product::SubHourly => "2D Surface Levels - Sub Hourly",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage provider hosting a mirror of the HRRR archive.
///
/// `Local` is accepted on the command line but has no registered URL
/// template; resolving assets against it fails with a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Azure,
    Google,
    Local,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Azure => "azure",
            CloudProvider::Google => "google",
            CloudProvider::Local => "local",
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role an asset plays within a STAC item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetRole {
    /// The GRIB2 file itself.
    Grib,
    /// The `.idx` byte-offset sidecar.
    Index,
}

impl AssetRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetRole::Grib => "grib",
            AssetRole::Index => "index",
        }
    }
}

/// Identity of one forecast run/hour: everything needed to resolve a
/// single GRIB2 object and describe it as a STAC item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastRunKey {
    pub region: Region,
    pub product: Product,
    pub cloud_provider: CloudProvider,
    /// Model-run issuance time, UTC, hour resolution.
    pub reference_datetime: DateTime<Utc>,
    /// Offset in hours from the reference datetime to the forecast instant.
    pub forecast_hour: u32,
}

impl ForecastRunKey {
    /// The instant this run/hour forecasts: reference time plus horizon.
    pub fn forecast_datetime(&self) -> DateTime<Utc> {
        self.reference_datetime + Duration::hours(i64::from(self.forecast_hour))
    }

    /// STAC item id, e.g. `hrrr-conus-sfc-2024-05-01T12-FH10`.
    pub fn item_id(&self) -> String {
        format!(
            "hrrr-{}-{}-{}-FH{}",
            self.region,
            self.product,
            self.reference_datetime.format("%Y-%m-%dT%H"),
            self.forecast_hour
        )
    }
}

impl fmt::Display for ForecastRunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.item_id())
    }
}
