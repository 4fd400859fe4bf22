//! GRIB2 layer extraction: raw band descriptors -> normalized layers.
//!
//! The metadata service reports bands in whatever order the index file
//! carries them; extraction re-sorts by band index so repeated calls for
//! the same asset always yield the same sequence.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::errors::FetchError;
use crate::locator::AssetLocation;
use crate::services::metadata_api::{GribMetadataApi, LayerDescriptor};

/// One band of a GRIB2 file, as published in `grib:layers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GribLayer {
    pub variable: String,
    pub level: String,
    pub units: Option<String>,
    pub band_index: u32,
}

/// Bounded-retry policy for transient metadata-service faults.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry (doubles each retry).
    pub initial_delay: Duration,
    /// Cap on the per-retry delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Unit for a GRIB variable code, per the NCEP parameter tables.
///
/// Unknown codes return `None`; the layer keeps its verbatim code and
/// simply carries no unit.
fn unit_for(variable: &str) -> Option<&'static str> {
    let unit = match variable {
        "TMP" | "DPT" | "POT" | "TSOIL" => "K",
        "RH" | "TCDC" | "LCDC" | "MCDC" | "HCDC" => "%",
        "UGRD" | "VGRD" | "GUST" | "WIND" | "USTM" | "VSTM" => "m s-1",
        "PRES" | "PRMSL" | "MSLMA" => "Pa",
        "VVEL" => "Pa s-1",
        "HGT" | "HPBL" | "VIS" | "SNOD" => "m",
        "REFC" | "REFD" => "dB",
        "APCP" | "WEASD" | "PWAT" => "kg m-2",
        "PRATE" => "kg m-2 s-1",
        "SPFH" => "kg kg-1",
        "CAPE" | "CIN" => "J kg-1",
        "HLCY" => "m2 s-2",
        "ABSV" => "s-1",
        "DSWRF" | "USWRF" | "DLWRF" | "ULWRF" | "SHTFL" | "LHTFL" => "W m-2",
        _ => return None,
    };
    Some(unit)
}

fn normalize(mut descriptors: Vec<LayerDescriptor>) -> Vec<GribLayer> {
    descriptors.sort_by_key(|d| d.message_number);
    descriptors
        .into_iter()
        .map(|d| GribLayer {
            units: unit_for(&d.variable).map(str::to_string),
            variable: d.variable,
            level: d.level,
            band_index: d.message_number,
        })
        .collect()
}

/// Fetches and normalizes the layer table for one asset.
///
/// Transient service faults are retried with exponential backoff up to
/// `retry.max_retries`; missing objects and malformed indexes are
/// terminal for the run.
pub async fn extract_layers<M: GribMetadataApi + ?Sized>(
    api: &M,
    location: &AssetLocation,
    retry: &RetryConfig,
) -> Result<Vec<GribLayer>, FetchError> {
    let mut delay = retry.initial_delay;
    let mut attempt = 0u32;

    loop {
        match api.layer_descriptors(location).await {
            Ok(descriptors) => return Ok(normalize(descriptors)),
            Err(err) if err.is_transient() && attempt < retry.max_retries => {
                attempt += 1;
                warn!(
                    href = %location.href,
                    attempt,
                    max_retries = retry.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient metadata fetch failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(retry.max_delay);
            }
            Err(err) => return Err(err),
        }
    }
}
