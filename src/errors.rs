//! Error taxonomy for run validation, metadata fetching, and item assembly.
//!
//! Validation errors are deterministic caller-input errors and are never
//! retried. Fetch errors come from the external metadata service; only
//! `TransientFetchError` is retry-eligible. `BuildError` wraps either kind
//! with the offending run key attached.

use thiserror::Error;

use crate::model::{CloudProvider, ForecastRunKey, Product, Region};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("product {product} is not published for region {region}")]
    UnsupportedProduct { region: Region, product: Product },

    #[error("no asset template registered for cloud provider {provider}")]
    UnsupportedCloudProvider { provider: CloudProvider },

    #[error(
        "forecast hour {forecast_hour} exceeds the maximum ({max_forecast_hour}) \
         for a {cycle_type} cycle of {region} {product}"
    )]
    ForecastHourOutOfRange {
        region: Region,
        product: Product,
        forecast_hour: u32,
        max_forecast_hour: u32,
        cycle_type: &'static str,
    },

    #[error("invalid reference datetime: {reason}")]
    InvalidReferenceHour { reason: String },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("asset not found at {href}")]
    AssetUnavailable { href: String },

    #[error("malformed GRIB index at {href}: {reason}")]
    MalformedGribHeader { href: String, reason: String },

    #[error("transient fetch failure for {href}: {reason}")]
    TransientFetchError { href: String, reason: String },
}

impl FetchError {
    /// Whether a bounded retry with backoff may resolve this failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::TransientFetchError { .. })
    }
}

#[derive(Debug, Error)]
pub enum BuildErrorKind {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// A per-run failure, self-describing for the assembler's failure report.
#[derive(Debug, Error)]
#[error("failed to build item {key}: {kind}")]
pub struct BuildError {
    pub key: ForecastRunKey,
    #[source]
    pub kind: BuildErrorKind,
}

impl BuildError {
    pub fn new(key: ForecastRunKey, kind: impl Into<BuildErrorKind>) -> Self {
        Self {
            key,
            kind: kind.into(),
        }
    }

    /// Coarse category label used in failure-report rows.
    pub fn category(&self) -> &'static str {
        match &self.kind {
            BuildErrorKind::Validation(ValidationError::UnsupportedProduct { .. }) => {
                "unsupported_product"
            }
            BuildErrorKind::Validation(ValidationError::UnsupportedCloudProvider { .. }) => {
                "unsupported_cloud_provider"
            }
            BuildErrorKind::Validation(ValidationError::ForecastHourOutOfRange { .. }) => {
                "forecast_hour_out_of_range"
            }
            BuildErrorKind::Validation(ValidationError::InvalidReferenceHour { .. }) => {
                "invalid_reference_hour"
            }
            BuildErrorKind::Fetch(FetchError::AssetUnavailable { .. }) => "asset_unavailable",
            BuildErrorKind::Fetch(FetchError::MalformedGribHeader { .. }) => {
                "malformed_grib_header"
            }
            BuildErrorKind::Fetch(FetchError::TransientFetchError { .. }) => "transient_fetch",
        }
    }
}
