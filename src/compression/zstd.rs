//! Handler for ZSTD compressed data

use log::debug;

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;

/// ZSTD compression handler (compression code 14)
pub struct ZstdHandler {
    /// Compression level (1-22)
    compression_level: i32,
}

impl ZstdHandler {
    /// Create a handler with the level GDAL uses by default
    pub fn new() -> Self {
        ZstdHandler { compression_level: 9 }
    }
}

impl Default for ZstdHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionHandler for ZstdHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        let decompressed = zstd::decode_all(data)
            .map_err(|e| TiffError::GenericError(format!("ZSTD decompression error: {}", e)))?;
        debug!("ZSTD: {} -> {} bytes", data.len(), decompressed.len());
        Ok(decompressed)
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        let compressed = zstd::encode_all(data, self.compression_level)
            .map_err(|e| TiffError::GenericError(format!("ZSTD compression error: {}", e)))?;
        debug!("ZSTD (level {}): {} -> {} bytes", self.compression_level, data.len(), compressed.len());
        Ok(compressed)
    }

    fn name(&self) -> &'static str {
        "ZSTD"
    }

    fn code(&self) -> u16 {
        compression::ZSTD
    }
}
