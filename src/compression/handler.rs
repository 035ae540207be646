//! Compression handler trait definition

use crate::tiff::errors::TiffResult;

/// Strategy trait for the codecs a strip or tile can be stored with
pub trait CompressionHandler: Send + Sync {
    /// Decompress one strip or tile
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Compress one strip or tile
    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Human-readable name used in logs
    fn name(&self) -> &'static str;

    /// Value of the Compression tag (259)
    fn code(&self) -> u16;
}
