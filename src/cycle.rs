//! Forecast cycle rules and per-region static configuration.
//!
//! HRRR issues a model run every hour over CONUS and every three hours
//! over Alaska. Runs issued at 00/06/12/18 UTC are "extended" cycles with
//! a 48-hour horizon; every other run is a "standard" 18-hour cycle. The
//! sub-hourly product is capped at 18 forecast hours even within extended
//! cycles. All of this is table-driven below so the rules stay data, not
//! scattered conditionals.

use chrono::Timelike;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ValidationError;
use crate::model::{ForecastRunKey, Product, Region};

pub const STANDARD_FORECAST_MAX_HOUR: u32 = 18;
pub const EXTENDED_FORECAST_MAX_HOUR: u32 = 48;

/// Horizon class of a forecast cycle, derived from the reference hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastCycleType {
    Standard,
    Extended,
}

impl ForecastCycleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastCycleType::Standard => "standard",
            ForecastCycleType::Extended => "extended",
        }
    }

    /// Maximum forecast hour the cycle itself permits, before any
    /// product-specific cap.
    pub fn max_forecast_hour(&self) -> u32 {
        match self {
            ForecastCycleType::Standard => STANDARD_FORECAST_MAX_HOUR,
            ForecastCycleType::Extended => EXTENDED_FORECAST_MAX_HOUR,
        }
    }
}

impl fmt::Display for ForecastCycleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static facts shared by every item in a region.
#[derive(Debug)]
pub struct RegionConfig {
    /// EPSG:4326 bounding box (xmin, ymin, xmax, ymax).
    pub bbox: [f64; 4],
    /// Hours between model runs (CONUS hourly, Alaska 3-hourly).
    pub cycle_cadence_hours: u32,
    /// Reference hours at which 48-hour extended cycles are issued.
    pub extended_cycle_hours: &'static [u32],
    /// Products published for this region.
    pub products: &'static [Product],
    /// Region segment of the archive object keys.
    pub key_segment: &'static str,
    /// File-name suffix inserted before `.grib2` (Alaska only).
    pub file_suffix: &'static str,
}

impl RegionConfig {
    /// Whether a model run is issued at this UTC wall-clock hour.
    pub fn runs_at(&self, hour: u32) -> bool {
        hour % self.cycle_cadence_hours == 0
    }

    /// Reference hours with runs, ascending over one UTC day.
    pub fn cycle_run_hours(&self) -> impl Iterator<Item = u32> {
        (0u32..24).step_by(self.cycle_cadence_hours as usize)
    }

    pub fn supports(&self, product: Product) -> bool {
        self.products.contains(&product)
    }

    /// GeoJSON polygon tracing the bbox.
    pub fn geometry(&self) -> serde_json::Value {
        let [xmin, ymin, xmax, ymax] = self.bbox;
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [[
                [xmax, ymin],
                [xmax, ymax],
                [xmin, ymax],
                [xmin, ymin],
                [xmax, ymin],
            ]],
        })
    }
}

const CONUS: RegionConfig = RegionConfig {
    bbox: [-134.0955, 21.1381, -60.9172, 52.6157],
    cycle_cadence_hours: 1,
    extended_cycle_hours: &[0, 6, 12, 18],
    products: &[
        Product::Surface,
        Product::Pressure,
        Product::Native,
        Product::SubHourly,
    ],
    key_segment: "conus",
    file_suffix: "",
};

// The Alaska archive carries no sub-hourly product.
const ALASKA: RegionConfig = RegionConfig {
    bbox: [-174.8849, 41.5960, -115.6988, 76.3464],
    cycle_cadence_hours: 3,
    extended_cycle_hours: &[0, 6, 12, 18],
    products: &[Product::Surface, Product::Pressure, Product::Native],
    key_segment: "alaska",
    file_suffix: ".ak",
};

pub fn region_config(region: Region) -> &'static RegionConfig {
    match region {
        Region::Conus => &CONUS,
        Region::Alaska => &ALASKA,
    }
}

/// Classifies a run as standard or extended from its reference hour.
///
/// Total over 0-23; hours outside the region's run cadence still classify
/// (validation of the cadence happens in [`validate`]).
pub fn classify_cycle(region: Region, reference_hour: u32) -> ForecastCycleType {
    if region_config(region)
        .extended_cycle_hours
        .contains(&reference_hour)
    {
        ForecastCycleType::Extended
    } else {
        ForecastCycleType::Standard
    }
}

/// Hard cap on forecast hours per product, regardless of cycle type.
fn product_max_hour(product: Product) -> u32 {
    match product {
        Product::SubHourly => STANDARD_FORECAST_MAX_HOUR,
        _ => EXTENDED_FORECAST_MAX_HOUR,
    }
}

/// Maximum valid forecast hour for a (region, product, cycle) combination.
pub fn max_forecast_hour(
    _region: Region,
    product: Product,
    cycle_type: ForecastCycleType,
) -> u32 {
    cycle_type.max_forecast_hour().min(product_max_hour(product))
}

/// Checks a run key against the cycle-length and availability rules.
///
/// Deterministic and side-effect free; callers never retry a failure.
pub fn validate(key: &ForecastRunKey) -> Result<(), ValidationError> {
    let config = region_config(key.region);

    if !config.supports(key.product) {
        return Err(ValidationError::UnsupportedProduct {
            region: key.region,
            product: key.product,
        });
    }

    let reference = key.reference_datetime;
    if reference.minute() != 0 || reference.second() != 0 || reference.nanosecond() != 0 {
        return Err(ValidationError::InvalidReferenceHour {
            reason: format!(
                "{} is not at hour resolution; runs are issued on the hour",
                reference.to_rfc3339()
            ),
        });
    }

    let reference_hour = reference.hour();
    if !config.runs_at(reference_hour) {
        return Err(ValidationError::InvalidReferenceHour {
            reason: format!(
                "{} does not issue a run at hour {:02}; valid hours step by {}",
                key.region, reference_hour, config.cycle_cadence_hours
            ),
        });
    }

    let cycle_type = classify_cycle(key.region, reference_hour);
    let max = max_forecast_hour(key.region, key.product, cycle_type);
    if key.forecast_hour > max {
        return Err(ValidationError::ForecastHourOutOfRange {
            region: key.region,
            product: key.product,
            forecast_hour: key.forecast_hour,
            max_forecast_hour: max,
            cycle_type: cycle_type.as_str(),
        });
    }

    Ok(())
}
