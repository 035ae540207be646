//! Handler for Adobe Deflate compressed data

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::debug;

use crate::tiff::constants::compression;
use crate::tiff::errors::TiffResult;
use super::handler::CompressionHandler;

/// Adobe Deflate (zlib stream) handler (compression code 8)
pub struct AdobeDeflateHandler {
    level: Compression,
}

impl AdobeDeflateHandler {
    /// Handler with zlib's default level
    pub fn new() -> Self {
        AdobeDeflateHandler { level: Compression::default() }
    }
}

impl Default for AdobeDeflateHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionHandler for AdobeDeflateHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        debug!("Deflate: {} -> {} bytes", data.len(), decompressed.len());
        Ok(decompressed)
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 4), self.level);
        encoder.write_all(data)?;
        let compressed = encoder.finish()?;
        debug!("Deflate: {} -> {} bytes", data.len(), compressed.len());
        Ok(compressed)
    }

    fn name(&self) -> &'static str {
        "Adobe Deflate"
    }

    fn code(&self) -> u16 {
        compression::DEFLATE
    }
}
