//! Image File Directory (IFD) structures
//!
//! An IFD is the tag table that describes one image inside a TIFF file.
//! Label rasters only ever use their first IFD; overviews are ignored.

use std::collections::HashMap;
use std::fmt;
use log::trace;

use crate::tiff::constants::{compression, tags};
use crate::utils::tag_utils;

/// Represents an Image File Directory (IFD) in a TIFF file
#[derive(Debug, Clone)]
pub struct IFD {
    /// Entries in this IFD, in insertion order
    pub entries: Vec<IFDEntry>,
    /// IFD number (0-based)
    pub number: usize,
    /// Offset to this IFD in the file
    pub offset: u64,
    /// Cached tag values for quick lookup
    tag_map: HashMap<u16, IFDEntry>,
}

/// One tag of an IFD
///
/// `value_offset` holds the value itself when it fits in the entry
/// (4 bytes for TIFF, 8 for BigTIFF) and a file offset otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// Value or offset to values
    pub value_offset: u64,
}

impl IFDEntry {
    /// Creates a new IFD entry
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        Self {
            tag,
            field_type,
            count,
            value_offset,
        }
    }

    /// Total size of the entry's values in bytes
    pub fn data_size(&self) -> u64 {
        tag_utils::get_field_type_size(self.field_type) as u64 * self.count
    }

    /// Whether the values live inside the entry rather than at an offset
    pub fn is_value_inline(&self, is_big_tiff: bool) -> bool {
        let inline_size = if is_big_tiff { 8 } else { 4 };
        self.data_size() <= inline_size
    }

    /// Returns a human-readable description of this entry
    pub fn description(&self) -> String {
        format!("Tag: {} ({}), Type: {} ({}), Count: {}, Value/Offset: {}",
                self.tag, tag_utils::get_tag_name(self.tag),
                self.field_type, tag_utils::get_field_type_name(self.field_type),
                self.count, self.value_offset)
    }
}

impl IFD {
    /// Creates an empty IFD
    pub fn new(number: usize, offset: u64) -> Self {
        IFD {
            entries: Vec::new(),
            number,
            offset,
            tag_map: HashMap::new(),
        }
    }

    /// Adds an entry, replacing any existing entry with the same tag
    pub fn add_entry(&mut self, entry: IFDEntry) {
        trace!("IFD #{}: {}", self.number, entry.description());

        if self.tag_map.contains_key(&entry.tag) {
            self.entries.retain(|e| e.tag != entry.tag);
        }
        self.tag_map.insert(entry.tag, entry.clone());
        self.entries.push(entry);
    }

    /// Gets a tag's inline value (or offset) directly
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.tag_map.get(&tag).map(|entry| entry.value_offset)
    }

    /// Checks if this IFD has a specific tag
    pub fn has_tag(&self, tag: u16) -> bool {
        self.tag_map.contains_key(&tag)
    }

    /// Gets an IFD entry by tag
    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.tag_map.get(&tag)
    }

    /// Width and height, if both tags are present
    pub fn get_dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Samples per pixel (TIFF default 1)
    pub fn get_samples_per_pixel(&self) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// Bits per sample for single-sample images (TIFF default 1)
    pub fn get_bits_per_sample(&self) -> u64 {
        self.get_tag_value(tags::BITS_PER_SAMPLE).unwrap_or(1)
    }

    /// Compression tag value (TIFF default: none)
    pub fn get_compression(&self) -> u64 {
        self.get_tag_value(tags::COMPRESSION).unwrap_or(compression::NONE as u64)
    }

    /// Whether the image data is organised in tiles instead of strips
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_WIDTH) && self.has_tag(tags::TILE_OFFSETS)
    }

    /// Gets the number of entries in this IFD
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;

        if let Some((width, height)) = self.get_dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }

        writeln!(f, "  Tags:")?;
        for entry in &self.entries {
            let value_display = match entry.tag {
                tags::COMPRESSION => format!("{} ({})",
                                             entry.value_offset,
                                             tag_utils::get_compression_name(entry.value_offset)),
                _ => entry.value_offset.to_string(),
            };

            writeln!(f, "    {} ({}): {} [{}]",
                     entry.tag, tag_utils::get_tag_name(entry.tag), value_display,
                     tag_utils::get_field_type_name(entry.field_type))?;
        }

        Ok(())
    }
}
