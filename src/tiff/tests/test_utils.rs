//! Byte-level TIFF assembly for reader tests
//!
//! `TiffBuilder` only writes little-endian single-strip files, so layouts
//! it never produces (big-endian, multi-strip, tiled) are put together here.

use std::io::Cursor;

use crate::io::byte_order::ByteOrder;
use crate::utils::tag_utils::get_field_type_size;

/// One tag with its values
pub struct RawEntry {
    pub tag: u16,
    pub field_type: u16,
    pub values: Vec<u64>,
}

impl RawEntry {
    pub fn new(tag: u16, field_type: u16, values: &[u64]) -> Self {
        RawEntry { tag, field_type, values: values.to_vec() }
    }

    fn byte_len(&self) -> usize {
        get_field_type_size(self.field_type) * self.values.len()
    }
}

fn put(buf: &mut Vec<u8>, order: ByteOrder, size: usize, value: u64) {
    let be = value.to_be_bytes();
    let le = value.to_le_bytes();
    match order {
        ByteOrder::BigEndian => buf.extend_from_slice(&be[8 - size..]),
        ByteOrder::LittleEndian => buf.extend_from_slice(&le[..size]),
    }
}

/// Lays out header, one IFD, out-of-line values and pixel chunks
///
/// The values of `offsets_tag` are replaced by the positions of `chunks`;
/// the entry must already hold one placeholder per chunk.
pub fn assemble(
    order: ByteOrder,
    big_tiff: bool,
    mut entries: Vec<RawEntry>,
    chunks: &[Vec<u8>],
    offsets_tag: u16,
) -> Cursor<Vec<u8>> {
    entries.sort_by_key(|e| e.tag);

    let offset_size = if big_tiff { 8 } else { 4 };
    let header_size = if big_tiff { 16 } else { 8 };
    let ifd_size = if big_tiff { 8 + 20 * entries.len() + 8 } else { 2 + 12 * entries.len() + 4 };
    let external_len: usize = entries
        .iter()
        .map(|e| if e.byte_len() > offset_size { e.byte_len() } else { 0 })
        .sum();

    let mut chunk_position = header_size + ifd_size + external_len;
    for entry in entries.iter_mut().filter(|e| e.tag == offsets_tag) {
        entry.values = chunks
            .iter()
            .map(|chunk| {
                let position = chunk_position;
                chunk_position += chunk.len();
                position as u64
            })
            .collect();
    }

    let mut buf = Vec::new();
    match order {
        ByteOrder::LittleEndian => buf.extend_from_slice(b"II"),
        ByteOrder::BigEndian => buf.extend_from_slice(b"MM"),
    }
    if big_tiff {
        put(&mut buf, order, 2, 43);
        put(&mut buf, order, 2, 8);
        put(&mut buf, order, 2, 0);
        put(&mut buf, order, 8, header_size as u64);
        put(&mut buf, order, 8, entries.len() as u64);
    } else {
        put(&mut buf, order, 2, 42);
        put(&mut buf, order, 4, header_size as u64);
        put(&mut buf, order, 2, entries.len() as u64);
    }

    let mut external = Vec::new();
    let mut external_position = header_size + ifd_size;
    for entry in &entries {
        let size = get_field_type_size(entry.field_type);
        put(&mut buf, order, 2, entry.tag as u64);
        put(&mut buf, order, 2, entry.field_type as u64);
        put(&mut buf, order, offset_size, entry.values.len() as u64);

        if entry.byte_len() <= offset_size {
            for &v in &entry.values {
                put(&mut buf, order, size, v);
            }
            buf.extend(std::iter::repeat(0u8).take(offset_size - entry.byte_len()));
        } else {
            put(&mut buf, order, offset_size, external_position as u64);
            for &v in &entry.values {
                put(&mut external, order, size, v);
            }
            external_position += entry.byte_len();
        }
    }
    put(&mut buf, order, offset_size, 0);

    buf.extend_from_slice(&external);
    for chunk in chunks {
        buf.extend_from_slice(chunk);
    }

    Cursor::new(buf)
}
