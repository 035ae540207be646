//! Low-level I/O for the GeoTIFF codec

pub mod seekable;
pub mod byte_order;
