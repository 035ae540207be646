//! TIFF writing utilities
//!
//! Alignment and entry ordering rules applied when laying out a file.

use std::collections::HashSet;
use std::io::Write;

use crate::tiff::errors::TiffResult;
use crate::tiff::ifd::IFDEntry;

/// Align an offset to the next word (4-byte) boundary
pub fn align_to_4_bytes(offset: u64) -> u64 {
    offset + calculate_padding(offset as usize) as u64
}

/// Padding needed after `data_len` bytes to reach a word boundary
pub fn calculate_padding(data_len: usize) -> usize {
    (4 - (data_len % 4)) % 4
}

/// Write the padding that follows a block of `data_len` bytes
pub fn write_padding(writer: &mut impl Write, data_len: usize) -> TiffResult<()> {
    let padding = calculate_padding(data_len);
    if padding > 0 {
        writer.write_all(&[0u8; 4][..padding])?;
    }
    Ok(())
}

/// Entries sorted by tag number, keeping the last occurrence of a duplicate
pub fn get_unique_sorted_entries(entries: &[IFDEntry]) -> Vec<IFDEntry> {
    let mut seen_tags = HashSet::new();
    let mut unique: Vec<IFDEntry> = entries
        .iter()
        .rev()
        .filter(|entry| seen_tags.insert(entry.tag))
        .cloned()
        .collect();

    unique.sort_by_key(|entry| entry.tag);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_align_to_words() {
        assert_eq!(align_to_4_bytes(8), 8);
        assert_eq!(align_to_4_bytes(9), 12);
        assert_eq!(align_to_4_bytes(11), 12);
    }

    #[test]
    fn duplicate_tags_keep_the_last_entry() {
        let entries = vec![
            IFDEntry::new(259, 3, 1, 1),
            IFDEntry::new(256, 4, 1, 10),
            IFDEntry::new(259, 3, 1, 8),
        ];
        let unique = get_unique_sorted_entries(&entries);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].tag, 256);
        assert_eq!(unique[1].value_offset, 8);
    }
}
