//! HTTP implementation of the GRIB metadata service backed by NOAA's
//! `.idx` sidecar files.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

use crate::errors::FetchError;
use crate::locator::AssetLocation;
use crate::services::metadata_api::{GribMetadataApi, LayerDescriptor};

/// Fetches and parses `.idx` files from a provider's HRRR archive.
pub struct IdxClient {
    client: reqwest::Client,
}

impl IdxClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl GribMetadataApi for IdxClient {
    async fn layer_descriptors(
        &self,
        location: &AssetLocation,
    ) -> Result<Vec<LayerDescriptor>, FetchError> {
        let href = &location.href;

        let response = self
            .client
            .get(href)
            .send()
            .await
            .map_err(|source| FetchError::TransientFetchError {
                href: href.clone(),
                reason: source.to_string(),
            })?;

        let status = response.status();
        // object-store mirrors report missing keys as 404 or 403
        if status == StatusCode::NOT_FOUND
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::GONE
        {
            return Err(FetchError::AssetUnavailable { href: href.clone() });
        }
        let response = response.error_for_status().map_err(|source| {
            FetchError::TransientFetchError {
                href: href.clone(),
                reason: source.to_string(),
            }
        })?;

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::TransientFetchError {
                href: href.clone(),
                reason: source.to_string(),
            })?;

        let descriptors = parse_idx(href, &body)?;
        debug!(href = %href, bands = descriptors.len(), "Index parsed");
        Ok(descriptors)
    }
}

/// Parses the colon-delimited `.idx` format into raw descriptors.
///
/// Each line looks like `1:0:d=2024050112:REFC:entire atmosphere:10 hour fcst:`.
pub fn parse_idx(href: &str, body: &str) -> Result<Vec<LayerDescriptor>, FetchError> {
    let malformed = |reason: String| FetchError::MalformedGribHeader {
        href: href.to_string(),
        reason,
    };

    let mut descriptors = Vec::new();
    for (line_number, line) in body.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() < 6 {
            return Err(malformed(format!(
                "line {}: expected at least 6 fields, got {}",
                line_number + 1,
                parts.len()
            )));
        }

        let message_number: u32 = parts[0]
            .parse()
            .map_err(|_| malformed(format!("line {}: bad message number {:?}", line_number + 1, parts[0])))?;
        let byte_offset: u64 = parts[1]
            .parse()
            .map_err(|_| malformed(format!("line {}: bad byte offset {:?}", line_number + 1, parts[1])))?;
        if !parts[2].starts_with("d=") {
            return Err(malformed(format!(
                "line {}: expected reference field d=..., got {:?}",
                line_number + 1,
                parts[2]
            )));
        }

        descriptors.push(LayerDescriptor {
            message_number,
            byte_offset,
            variable: parts[3].to_string(),
            level: parts[4].to_string(),
            forecast: parts[5..].join(":").trim_end_matches(':').to_string(),
        });
    }

    if descriptors.is_empty() {
        return Err(malformed("no band descriptors found".to_string()));
    }

    Ok(descriptors)
}
