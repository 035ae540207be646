//! TIFF validation utilities
//!
//! Sanity checks applied while walking a file, so that a truncated or
//! corrupt label raster fails with a TIFF error instead of a panic.

use log::{debug, error, warn};
use std::io::SeekFrom;

use crate::io::byte_order::ByteOrderHandler;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::header;
use crate::tiff::errors::{TiffError, TiffResult};

/// Directory chains longer than this are treated as corrupt
pub const MAX_IFDS: usize = 256;

/// Validates that an IFD offset points inside the file and past the header
pub fn validate_ifd_offset(offset: u64, file_size: u64) -> TiffResult<()> {
    if offset >= file_size || offset < 8 {
        return Err(TiffError::GenericError(format!(
            "Invalid IFD offset: {} (file size: {})",
            offset, file_size
        )));
    }

    Ok(())
}

/// Validates that `len` bytes starting at `offset` lie inside the file
pub fn validate_data_range(offset: u64, len: u64, file_size: u64, what: &str) -> TiffResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= file_size => Ok(()),
        _ => Err(TiffError::GenericError(format!(
            "{} at offset {} (+{} bytes) runs past end of file ({} bytes)",
            what, offset, len, file_size
        ))),
    }
}

/// Size of the underlying stream, restoring the current position afterwards
pub fn get_file_size(reader: &mut dyn SeekableReader) -> TiffResult<u64> {
    let current_position = reader.stream_position()?;
    let file_size = match reader.seek(SeekFrom::End(0)) {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not determine file size: {}", e);
            u64::MAX
        }
    };
    reader.seek(SeekFrom::Start(current_position))?;

    Ok(file_size)
}

/// Validates the two BigTIFF header fields that follow the version number
pub fn validate_bigtiff_header(
    reader: &mut dyn SeekableReader,
    byte_order_handler: &dyn ByteOrderHandler,
) -> TiffResult<()> {
    let offset_size = byte_order_handler.read_u16(reader)?;
    let reserved = byte_order_handler.read_u16(reader)?;

    debug!("BigTIFF offset size: {}, reserved: {}", offset_size, reserved);

    if offset_size != header::BIGTIFF_OFFSET_SIZE || reserved != 0 {
        error!("Invalid BigTIFF header: offset_size={}, reserved={}", offset_size, reserved);
        return Err(TiffError::InvalidBigTIFFHeader);
    }

    Ok(())
}
