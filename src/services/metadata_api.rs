//! Trait and types for the external GRIB2 metadata service.

use crate::errors::FetchError;
use crate::locator::AssetLocation;

/// One raw band descriptor as reported by the metadata service.
///
/// Maps directly to a line of a NOAA `.idx` sidecar file:
/// `message:byte_offset:d=YYYYMMDDHH:VARIABLE:level:forecast:`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescriptor {
    /// 1-based GRIB message number; the band index within the file.
    pub message_number: u32,
    /// Byte offset of the message within the GRIB2 file.
    pub byte_offset: u64,
    /// Variable code, e.g. `TMP`, `REFC`, `UGRD`.
    pub variable: String,
    /// Vertical level or layer description, e.g. `2 m above ground`.
    pub level: String,
    /// Forecast time description, e.g. `10 hour fcst`.
    pub forecast: String,
}

/// Abstraction over whatever can describe the bands of a GRIB2 asset.
///
/// Implementations must signal "object missing", "malformed data", and
/// "transient fault" distinctly so the layer extractor can apply its
/// retry policy to the last category only.
#[async_trait::async_trait]
pub trait GribMetadataApi: Send + Sync {
    /// Returns the raw band descriptors for the asset at `location`.
    async fn layer_descriptors(
        &self,
        location: &AssetLocation,
    ) -> Result<Vec<LayerDescriptor>, FetchError>;
}
