//! GeoTIFF reading and writing
//!
//! Reads single-band label rasters (TIFF or BigTIFF, either byte order,
//! strips or tiles) and writes georeferenced 8-bit masks.

pub mod errors;
pub mod ifd;
pub(crate) mod types;
pub mod reader;
pub mod raster_reader;
pub mod geo_keys;
pub mod builder;
mod builders;
pub mod constants;
pub(crate) mod validation;
#[cfg(test)]
mod tests;

pub use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use errors::{TiffError, TiffResult};
pub use ifd::{IFD, IFDEntry};
pub use reader::TiffReader;
pub use raster_reader::{BandData, RasterReader};
pub use geo_keys::{GeoKeyDirectory, GeoReference, EPSG_WGS84};
pub use types::TiffFile;
pub use builder::TiffBuilder;
