//! TIFF file reader implementation
//!
//! Walks the header and IFD chain of a TIFF or BigTIFF file and decodes tag
//! values on demand. Pixel data is read by `raster_reader`, which shares the
//! same open stream.

use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, SeekFrom};
use std::path::Path;

use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{field_types, header};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TiffFile;
use crate::tiff::validation;
use crate::utils::tag_utils;

/// Reader for TIFF and BigTIFF directory structures
pub struct TiffReader {
    /// Byte order handler, set once the header has been read
    byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Whether the last file read was BigTIFF
    is_big_tiff: bool,
}

impl TiffReader {
    /// Creates a new TIFF reader
    pub fn new() -> Self {
        TiffReader {
            byte_order_handler: None,
            is_big_tiff: false,
        }
    }

    /// Opens a file for use with `read` and the value accessors
    pub fn open(path: &Path) -> TiffResult<BufReader<File>> {
        let file = File::open(path)?;
        Ok(BufReader::with_capacity(1024 * 1024, file))
    }

    /// Loads the directory structure of a file on disk
    pub fn load(&mut self, path: &Path) -> TiffResult<TiffFile> {
        info!("Loading TIFF file: {}", path.display());
        let mut reader = Self::open(path)?;
        self.read(&mut reader)
    }

    /// Reads the header and every IFD in the chain
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> TiffResult<TiffFile> {
        reader.seek(SeekFrom::Start(0))?;

        let byte_order = ByteOrder::detect(reader)?;
        debug!("Detected byte order: {}", byte_order.name());
        let handler = byte_order.create_handler();

        let version = handler.read_u16(reader)?;
        self.is_big_tiff = match version {
            header::BIG_TIFF_VERSION => {
                validation::validate_bigtiff_header(reader, handler.as_ref())?;
                true
            }
            header::TIFF_VERSION => false,
            other => return Err(TiffError::UnsupportedVersion(other)),
        };
        self.byte_order_handler = Some(handler);

        let first_ifd_offset = self.read_offset(reader)?;
        let file_size = validation::get_file_size(reader)?;
        validation::validate_ifd_offset(first_ifd_offset, file_size)?;

        let mut tiff = TiffFile::new(self.is_big_tiff, byte_order);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;

        if tiff.ifds.is_empty() {
            return Err(TiffError::NoImageDirectory);
        }

        debug!("Read {} IFDs ({})", tiff.ifds.len(), if self.is_big_tiff { "BigTIFF" } else { "TIFF" });
        Ok(tiff)
    }

    fn handler(&self) -> TiffResult<&dyn ByteOrderHandler> {
        self.byte_order_handler
            .as_deref()
            .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Reads a 4-byte (TIFF) or 8-byte (BigTIFF) offset
    fn read_offset(&self, reader: &mut dyn SeekableReader) -> TiffResult<u64> {
        let handler = self.handler()?;
        if self.is_big_tiff {
            Ok(handler.read_u64(reader)?)
        } else {
            Ok(handler.read_u32(reader)? as u64)
        }
    }

    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_ifd_offset: u64, file_size: u64) -> TiffResult<Vec<IFD>> {
        let mut ifds = Vec::new();
        let mut ifd_offset = first_ifd_offset;

        while ifd_offset != 0 && ifds.len() < validation::MAX_IFDS {
            if ifd_offset >= file_size {
                warn!("IFD offset {} exceeds file size {}, stopping IFD chain", ifd_offset, file_size);
                break;
            }

            let ifd = self.read_ifd(reader, ifd_offset, ifds.len())?;

            // read_ifd leaves the stream right after the last entry
            let next_ifd_offset = match self.read_offset(reader) {
                Ok(offset) => offset,
                Err(e) => {
                    warn!("Error reading next IFD offset: {}", e);
                    ifds.push(ifd);
                    break;
                }
            };

            ifds.push(ifd);

            if next_ifd_offset != 0 && (next_ifd_offset >= file_size || next_ifd_offset < 8) {
                warn!("Invalid next IFD offset: {}, stopping IFD chain", next_ifd_offset);
                break;
            }
            ifd_offset = next_ifd_offset;
        }

        Ok(ifds)
    }

    /// Reads one IFD starting at `offset`
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> TiffResult<IFD> {
        reader.seek(SeekFrom::Start(offset))?;
        let handler = self.handler()?;

        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            let entry = self.read_ifd_entry(reader)?;
            ifd.add_entry(entry);
        }

        debug!("Read IFD #{} with {} entries", number, ifd.entry_count());
        Ok(ifd)
    }

    /// Reads one entry, normalising inline values to little-endian packing
    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> TiffResult<IFDEntry> {
        let handler = self.handler()?;

        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        let field_len = if self.is_big_tiff { 8 } else { 4 };
        let mut raw = [0u8; 8];
        reader.read_exact(&mut raw[..field_len])?;

        let mut entry = IFDEntry::new(tag, field_type, count, 0);
        entry.value_offset = if entry.is_value_inline(self.is_big_tiff) {
            Self::pack_inline_values(&raw[..field_len], &entry, handler)
        } else {
            Self::decode_offset(&raw[..field_len], handler)
        };

        Ok(entry)
    }

    fn decode_offset(raw: &[u8], handler: &dyn ByteOrderHandler) -> u64 {
        let mut bytes = [0u8; 8];
        bytes[..raw.len()].copy_from_slice(raw);
        match (handler.byte_order(), raw.len()) {
            (ByteOrder::LittleEndian, _) => u64::from_le_bytes(bytes),
            (ByteOrder::BigEndian, 4) => u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as u64,
            (ByteOrder::BigEndian, _) => u64::from_be_bytes(bytes),
        }
    }

    fn pack_inline_values(raw: &[u8], entry: &IFDEntry, handler: &dyn ByteOrderHandler) -> u64 {
        let size = tag_utils::get_field_type_size(entry.field_type);
        let mut packed = 0u64;

        for i in 0..entry.count as usize {
            let chunk = &raw[i * size..(i + 1) * size];
            let value = match handler.byte_order() {
                ByteOrder::LittleEndian => chunk.iter().rev().fold(0u64, |acc, b| (acc << 8) | *b as u64),
                ByteOrder::BigEndian => chunk.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64),
            };
            packed |= value << (i * size * 8);
        }

        packed
    }

    /// Reads a tag's values as integers, inline or at an offset
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<u64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;

        if entry.is_value_inline(self.is_big_tiff) {
            return Ok(tag_utils::split_inline_values(entry.value_offset, entry));
        }

        reader.seek(SeekFrom::Start(entry.value_offset))?;
        tag_utils::read_tag_value_array(reader, entry, self.handler()?)
    }

    /// Reads a DOUBLE array tag (pixel scale, tiepoints, GeoDoubleParams)
    pub fn read_f64_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<f64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        if entry.field_type != field_types::DOUBLE {
            return Err(TiffError::UnsupportedFieldType(entry.field_type));
        }

        if entry.is_value_inline(self.is_big_tiff) {
            // A single double only fits inline in BigTIFF, which packs it as-is
            return Ok(vec![f64::from_bits(entry.value_offset)]);
        }

        reader.seek(SeekFrom::Start(entry.value_offset))?;
        let handler = self.handler()?;
        let mut values = Vec::with_capacity(entry.count as usize);
        for _ in 0..entry.count {
            values.push(handler.read_f64(reader)?);
        }
        Ok(values)
    }

    /// Reads an ASCII tag, dropping the trailing NUL terminator(s)
    pub fn read_ascii(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<String> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;

        let mut buffer = if entry.is_value_inline(self.is_big_tiff) {
            entry.value_offset.to_le_bytes()[..entry.count as usize].to_vec()
        } else {
            reader.seek(SeekFrom::Start(entry.value_offset))?;
            let mut buffer = vec![0u8; entry.count as usize];
            reader.read_exact(&mut buffer)?;
            buffer
        };

        while buffer.last() == Some(&0) {
            buffer.pop();
        }

        String::from_utf8(buffer)
            .map_err(|e| TiffError::GenericError(format!("Invalid UTF-8 string in tag {}: {}", tag, e)))
    }

    /// Returns whether the last file read was a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Gets the current byte order handler
    pub fn byte_order_handler(&self) -> Option<&dyn ByteOrderHandler> {
        self.byte_order_handler.as_deref()
    }
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}
