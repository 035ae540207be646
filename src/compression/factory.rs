//! Factory for creating compression handlers

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;
use super::uncompressed::UncompressedHandler;
use super::deflate::AdobeDeflateHandler;
use super::zstd::ZstdHandler;

/// Factory for creating compression handlers
pub struct CompressionFactory;

impl CompressionFactory {
    /// Create a handler for the value of a Compression tag
    pub fn create_handler(code: u64) -> TiffResult<Box<dyn CompressionHandler>> {
        match u16::try_from(code) {
            Ok(compression::NONE) => Ok(Box::new(UncompressedHandler)),
            Ok(compression::DEFLATE) => Ok(Box::new(AdobeDeflateHandler::new())),
            Ok(compression::ZSTD) => Ok(Box::new(ZstdHandler::new())),
            _ => Err(TiffError::UnsupportedCompression(code)),
        }
    }

    /// Get a handler by the name used on the command line and in config files
    pub fn get_handler_by_name(name: &str) -> TiffResult<Box<dyn CompressionHandler>> {
        match name.trim().to_lowercase().as_str() {
            "uncompressed" | "none" => Ok(Box::new(UncompressedHandler)),
            "deflate" | "zip" | "adobe deflate" => Ok(Box::new(AdobeDeflateHandler::new())),
            "zstd" => Ok(Box::new(ZstdHandler::new())),
            other => Err(TiffError::GenericError(format!("Unknown compression type: {}", other))),
        }
    }

    /// Names accepted by `get_handler_by_name`
    pub fn available_names() -> &'static [&'static str] {
        &["none", "deflate", "zstd"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_handlers_from_tag_values() {
        assert_eq!(CompressionFactory::create_handler(1).unwrap().code(), compression::NONE);
        assert_eq!(CompressionFactory::create_handler(8).unwrap().code(), compression::DEFLATE);
        assert_eq!(CompressionFactory::create_handler(14).unwrap().code(), compression::ZSTD);
    }

    #[test]
    fn rejects_lzw() {
        let err = CompressionFactory::create_handler(compression::LZW as u64).err().unwrap();
        assert!(matches!(err, TiffError::UnsupportedCompression(5)));
    }

    #[test]
    fn every_codec_restores_its_input() {
        let strip: Vec<u8> = (0..4096u32).map(|i| (i % 9) as u8).collect();
        for name in CompressionFactory::available_names() {
            let handler = CompressionFactory::get_handler_by_name(name).unwrap();
            let packed = handler.compress(&strip).unwrap();
            assert_eq!(handler.decompress(&packed).unwrap(), strip, "codec {}", name);
        }
    }
}
