//! Pipeline error types
//!
//! `TiffError` covers the codec; everything from region lookup to export
//! submission reports a `PipelineError`.

use std::fmt;
use std::io;

use crate::tiff::errors::TiffError;

/// Errors raised by the land-cover pipeline
#[derive(Debug)]
pub enum PipelineError {
    /// GeoTIFF decoding or encoding failed
    Tiff(TiffError),
    /// I/O error outside the codec
    Io(io::Error),
    /// Boundary file is not valid GeoJSON
    GeoJson(serde_json::Error),
    /// Geometry that cannot be used as a region
    InvalidGeometry(String),
    /// Configuration file could not be parsed or holds invalid values
    Config(String),
    /// Date string or range that cannot be used
    InvalidDate(String),
    /// CRS the crate cannot transform to or from
    UnsupportedCrs(String),
    /// No boundary feature carries the requested name
    RegionNotFound { attribute: String, name: String },
    /// More than one boundary feature carries the requested name
    AmbiguousRegion { name: String, count: usize },
    /// Nothing left to composite after filtering
    EmptyCollection(String),
    /// Export grid exceeds the pixel ceiling
    ExportQuotaExceeded { description: String, pixels: u64, max_pixels: u64 },
    /// Export task or sink failure
    Export(String),
    /// Invalid parameter value
    InvalidParameter(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Tiff(e) => write!(f, "{}", e),
            PipelineError::Io(e) => write!(f, "I/O error: {}", e),
            PipelineError::GeoJson(e) => write!(f, "GeoJSON error: {}", e),
            PipelineError::InvalidGeometry(msg) => write!(f, "Invalid geometry: {}", msg),
            PipelineError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PipelineError::InvalidDate(msg) => write!(f, "Invalid date: {}", msg),
            PipelineError::UnsupportedCrs(msg) => write!(f, "Unsupported CRS: {}", msg),
            PipelineError::RegionNotFound { attribute, name } => {
                write!(f, "No boundary with {} = '{}'", attribute, name)
            }
            PipelineError::AmbiguousRegion { name, count } => {
                write!(f, "Region name '{}' matches {} boundaries", name, count)
            }
            PipelineError::EmptyCollection(msg) => write!(f, "Empty image collection: {}", msg),
            PipelineError::ExportQuotaExceeded { description, pixels, max_pixels } => write!(
                f,
                "Export '{}' needs {} pixels, more than the maximum of {}",
                description, pixels, max_pixels
            ),
            PipelineError::Export(msg) => write!(f, "Export failed: {}", msg),
            PipelineError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Tiff(e) => Some(e),
            PipelineError::Io(e) => Some(e),
            PipelineError::GeoJson(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TiffError> for PipelineError {
    fn from(error: TiffError) -> Self {
        PipelineError::Tiff(error)
    }
}

impl From<io::Error> for PipelineError {
    fn from(error: io::Error) -> Self {
        PipelineError::Io(error)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(error: serde_json::Error) -> Self {
        PipelineError::GeoJson(error)
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(error: toml::de::Error) -> Self {
        PipelineError::Config(error.to_string())
    }
}

impl From<chrono::ParseError> for PipelineError {
    fn from(error: chrono::ParseError) -> Self {
        PipelineError::InvalidDate(error.to_string())
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
