//! Basic TIFF tag strategies
//!
//! Structural tags of a single-band unsigned raster: dimensions, sample
//! layout, compression and the strip table.

use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::constants::{tags, field_types, photometric, planar_config, sample_format};
use log::{debug, info};

/// Adds basic TIFF tags to an IFD
pub struct BasicTagsBuilder;

impl BasicTagsBuilder {
    /// Add the tags of a single-band grayscale image
    ///
    /// Min/max sample values are left to the caller since a class raster
    /// rarely spans the full bit depth.
    pub fn add_basic_gray_tags(
        ifd: &mut IFD,
        width: u32,
        height: u32,
        bits_per_sample: u16,
        compression: u16
    ) {
        info!("Adding grayscale tags for {}x{} image, {} bits", width, height, bits_per_sample);

        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, width as u64));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, field_types::LONG, 1, height as u64));
        ifd.add_entry(IFDEntry::new(tags::BITS_PER_SAMPLE, field_types::SHORT, 1, bits_per_sample as u64));
        ifd.add_entry(IFDEntry::new(tags::COMPRESSION, field_types::SHORT, 1, compression as u64));
        ifd.add_entry(IFDEntry::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            field_types::SHORT,
            1,
            photometric::BLACK_IS_ZERO as u64,
        ));
        ifd.add_entry(IFDEntry::new(tags::SAMPLES_PER_PIXEL, field_types::SHORT, 1, 1));
        ifd.add_entry(IFDEntry::new(
            tags::PLANAR_CONFIGURATION,
            field_types::SHORT,
            1,
            planar_config::CHUNKY as u64,
        ));
        ifd.add_entry(IFDEntry::new(
            tags::SAMPLE_FORMAT,
            field_types::SHORT,
            1,
            sample_format::UNSIGNED as u64,
        ));
    }

    /// Record the value range actually present in the band
    pub fn add_sample_range(ifd: &mut IFD, min: u16, max: u16) {
        debug!("Sample range: {}..={}", min, max);
        ifd.add_entry(IFDEntry::new(tags::MIN_SAMPLE_VALUE, field_types::SHORT, 1, min as u64));
        ifd.add_entry(IFDEntry::new(tags::MAX_SAMPLE_VALUE, field_types::SHORT, 1, max as u64));
    }

    /// Store the whole (already compressed) band as one strip
    ///
    /// StripOffsets is a placeholder until the writer knows where the strip
    /// lands. BigTIFF files use LONG8 for both strip tables.
    pub fn setup_single_strip(
        ifd: &mut IFD,
        image_data: &mut std::collections::BTreeMap<usize, Vec<u8>>,
        ifd_index: usize,
        strip_data: Vec<u8>,
        is_big_tiff: bool
    ) {
        info!("Setting up single strip: {} bytes", strip_data.len());

        let offset_type = if is_big_tiff { field_types::LONG8 } else { field_types::LONG };
        ifd.add_entry(IFDEntry::new(tags::STRIP_OFFSETS, offset_type, 1, 0));
        ifd.add_entry(IFDEntry::new(tags::STRIP_BYTE_COUNTS, offset_type, 1, strip_data.len() as u64));

        if let Some((_, height)) = ifd.get_dimensions() {
            ifd.add_entry(IFDEntry::new(tags::ROWS_PER_STRIP, field_types::LONG, 1, height));
        }

        image_data.insert(ifd_index, strip_data);
    }
}
