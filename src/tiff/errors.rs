//! Custom error types for GeoTIFF encoding and decoding

use std::fmt;
use std::io;

/// TIFF-specific error types
#[derive(Debug)]
pub enum TiffError {
    /// I/O error
    IoError(io::Error),
    /// Invalid byte order marker
    InvalidByteOrder(u16),
    /// Invalid BigTIFF header
    InvalidBigTIFFHeader,
    /// Unsupported TIFF version
    UnsupportedVersion(u16),
    /// Tag not found
    TagNotFound(u16),
    /// Unsupported field type
    UnsupportedFieldType(u16),
    /// Unsupported compression method
    UnsupportedCompression(u64),
    /// Sample layout that a label band cannot have (bits, samples per pixel)
    UnsupportedSampleLayout { bits_per_sample: u64, samples_per_pixel: u64 },
    /// Strip or tile decoded to fewer samples than its layout declares
    TruncatedChunk { offset: u64, expected: usize, actual: usize },
    /// Image dimensions not found
    MissingDimensions,
    /// File carries no IFD at all
    NoImageDirectory,
    /// Raster lacks the tags needed to place it on a map
    MissingGeoreference(String),
    /// Generic error with message
    GenericError(String),
}

impl fmt::Display for TiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiffError::IoError(e) => write!(f, "I/O error: {}", e),
            TiffError::InvalidByteOrder(v) => write!(f, "Invalid byte order marker: {:#06x}", v),
            TiffError::InvalidBigTIFFHeader => write!(f, "Invalid BigTIFF header"),
            TiffError::UnsupportedVersion(v) => write!(f, "Unsupported TIFF version: {}", v),
            TiffError::TagNotFound(tag) => write!(f, "Tag not found: {}", tag),
            TiffError::UnsupportedFieldType(ft) => write!(f, "Unsupported field type: {}", ft),
            TiffError::UnsupportedCompression(c) => write!(f, "Unsupported compression method: {}", c),
            TiffError::UnsupportedSampleLayout { bits_per_sample, samples_per_pixel } => write!(
                f,
                "Unsupported sample layout: {} bits x {} samples (expected a single 8 or 16 bit band)",
                bits_per_sample, samples_per_pixel
            ),
            TiffError::TruncatedChunk { offset, expected, actual } => write!(
                f,
                "Chunk at offset {} holds {} samples, expected {}",
                offset, actual, expected
            ),
            TiffError::MissingDimensions => write!(f, "Image dimensions not found"),
            TiffError::NoImageDirectory => write!(f, "No image file directory found"),
            TiffError::MissingGeoreference(what) => write!(f, "Missing georeference: {}", what),
            TiffError::GenericError(msg) => write!(f, "TIFF error: {}", msg),
        }
    }
}

impl std::error::Error for TiffError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TiffError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TiffError {
    fn from(error: io::Error) -> Self {
        TiffError::IoError(error)
    }
}

impl From<String> for TiffError {
    fn from(msg: String) -> Self {
        TiffError::GenericError(msg)
    }
}

/// Result type for TIFF operations
pub type TiffResult<T> = Result<T, TiffError>;
