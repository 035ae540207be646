//! Compression handling for TIFF strips and tiles
//!
//! Label rasters may come in any of the supported codecs; masks are written
//! with whichever one the export asks for.

mod handler;
mod uncompressed;
mod deflate;
mod factory;
mod zstd;

pub use handler::CompressionHandler;
pub use uncompressed::UncompressedHandler;
pub use deflate::AdobeDeflateHandler;
pub use factory::CompressionFactory;
pub use zstd::ZstdHandler;
