//! TIFF utility functions
//!
//! Helpers shared by the tag builders for laying out tag values.

use std::collections::BTreeMap;
use log::trace;

use crate::tiff::ifd::{IFD, IFDEntry};

/// External tag data keyed by (IFD index, tag)
pub type ExternalData = BTreeMap<(usize, u16), Vec<u8>>;

/// Adds a tag whose values live outside the IFD entry
///
/// The entry's offset is a placeholder; the writer fills it in once the
/// position of `data` in the file is known.
pub fn create_external_tag(
    ifd: &mut IFD,
    external_data: &mut ExternalData,
    ifd_index: usize,
    tag: u16,
    field_type: u16,
    count: u64,
    data: Vec<u8>
) {
    trace!("External tag {} on IFD #{}: {} bytes", tag, ifd_index, data.len());
    ifd.add_entry(IFDEntry::new(tag, field_type, count, 0));
    external_data.insert((ifd_index, tag), data);
}

/// Adds a tag whose values fit in the entry, removing stale external data
pub fn create_inline_tag(
    ifd: &mut IFD,
    external_data: &mut ExternalData,
    ifd_index: usize,
    entry: IFDEntry
) {
    external_data.remove(&(ifd_index, entry.tag));
    ifd.add_entry(entry);
}

/// Little-endian bytes of a DOUBLE array
pub fn f64s_to_le_bytes(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Little-endian bytes of a SHORT array
pub fn u16s_to_le_bytes(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// NUL-terminated bytes of an ASCII tag
pub fn ascii_bytes(value: &str) -> Vec<u8> {
    let mut bytes = value.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::constants::{field_types, tags};

    #[test]
    fn inline_tag_drops_previous_external_bytes() {
        let mut ifd = IFD::new(0, 0);
        let mut external = ExternalData::new();
        create_external_tag(&mut ifd, &mut external, 0, tags::GDAL_NODATA, field_types::ASCII, 8, vec![0; 8]);
        create_inline_tag(&mut ifd, &mut external, 0, IFDEntry::new(tags::GDAL_NODATA, field_types::ASCII, 4, 0));

        assert!(external.is_empty());
        assert_eq!(ifd.entry_count(), 1);
        assert_eq!(ifd.get_entry(tags::GDAL_NODATA).unwrap().count, 4);
    }

    #[test]
    fn ascii_values_are_nul_terminated() {
        assert_eq!(ascii_bytes("255"), b"255\0".to_vec());
    }
}
