//! TIFF writing strategies
//!
//! Lays a file out as: header, every IFD, external tag data, image data.
//! Offsets are computed up front so that each block is written once.

use crate::tiff::ifd::IFD;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::constants::{header, tags};
use crate::utils::tiff_utils::ExternalData;
use crate::utils::write_utils;
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Offsets of every block in the file being written
struct Layout {
    ifd_offsets: Vec<u64>,
    tag_data_offsets: BTreeMap<(usize, u16), u64>,
    end_of_file: u64,
}

/// Handles writing TIFF files to disk
pub struct WriterBuilder;

impl WriterBuilder {
    /// Write a complete little-endian TIFF file to disk
    pub fn write(
        is_big_tiff: bool,
        ifds: &[IFD],
        image_data: &BTreeMap<usize, Vec<u8>>,
        external_data: &ExternalData,
        output_path: &Path
    ) -> TiffResult<()> {
        info!("Writing TIFF to {}", output_path.display());

        let file = File::create(output_path)?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);
        Self::write_to(&mut writer, is_big_tiff, ifds, image_data, external_data)?;
        writer.flush()?;
        Ok(())
    }

    /// Write a complete file to any seekable sink
    pub fn write_to(
        writer: &mut (impl Write + Seek),
        is_big_tiff: bool,
        ifds: &[IFD],
        image_data: &BTreeMap<usize, Vec<u8>>,
        external_data: &ExternalData
    ) -> TiffResult<()> {
        let sorted_ifds = Self::prepare_sorted_ifds(ifds);
        let header_size = if is_big_tiff { 16 } else { 8 };
        let layout = Self::calculate_offsets(&sorted_ifds, external_data, image_data, header_size, is_big_tiff);

        if !is_big_tiff && layout.end_of_file > u32::MAX as u64 {
            return Err(TiffError::GenericError(format!(
                "File would be {} bytes, beyond classic TIFF's 4 GiB offset range; use BigTIFF",
                layout.end_of_file
            )));
        }
        debug!("Laid out {} IFDs, file size {} bytes", sorted_ifds.len(), layout.end_of_file);

        Self::write_header(writer, is_big_tiff)?;
        let first_ifd_offset = layout.ifd_offsets.first().copied().unwrap_or(0);
        Self::write_first_ifd_offset(writer, first_ifd_offset, is_big_tiff)?;
        Self::write_ifds(writer, &sorted_ifds, &layout, is_big_tiff)?;
        Self::write_external_data(writer, external_data, &layout.tag_data_offsets)?;
        Self::write_image_data(writer, image_data, &layout.tag_data_offsets)?;

        Ok(())
    }

    /// Sort each IFD's entries by tag, as readers expect
    fn prepare_sorted_ifds(ifds: &[IFD]) -> Vec<IFD> {
        ifds.iter().map(|ifd| {
            let mut sorted_ifd = ifd.clone();
            sorted_ifd.entries = write_utils::get_unique_sorted_entries(&ifd.entries);
            sorted_ifd
        }).collect()
    }

    fn calculate_offsets(
        sorted_ifds: &[IFD],
        external_data: &ExternalData,
        image_data: &BTreeMap<usize, Vec<u8>>,
        header_size: u64,
        is_big_tiff: bool
    ) -> Layout {
        let mut current_offset = header_size;
        let mut ifd_offsets = Vec::with_capacity(sorted_ifds.len());
        let mut tag_data_offsets = BTreeMap::new();

        for ifd in sorted_ifds {
            ifd_offsets.push(current_offset);
            current_offset += Self::calculate_ifd_size(ifd, is_big_tiff);
        }

        for (key, data) in external_data {
            tag_data_offsets.insert(*key, current_offset);
            current_offset = write_utils::align_to_4_bytes(current_offset + data.len() as u64);
        }

        for (ifd_index, data) in image_data {
            if let Some(ifd) = sorted_ifds.get(*ifd_index) {
                for tag in [tags::STRIP_OFFSETS, tags::TILE_OFFSETS] {
                    if ifd.has_tag(tag) {
                        tag_data_offsets.insert((*ifd_index, tag), current_offset);
                    }
                }
            }
            current_offset = write_utils::align_to_4_bytes(current_offset + data.len() as u64);
        }

        Layout { ifd_offsets, tag_data_offsets, end_of_file: current_offset }
    }

    fn write_header(writer: &mut (impl Write + Seek), is_big_tiff: bool) -> TiffResult<()> {
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&header::LITTLE_ENDIAN_MARKER)?;

        if is_big_tiff {
            writer.write_all(&header::BIG_TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&header::BIGTIFF_OFFSET_SIZE.to_le_bytes())?;
            writer.write_all(&[0u8, 0])?;  // Reserved
            writer.write_all(&[0u8; 8])?;
        } else {
            writer.write_all(&header::TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&[0u8; 4])?;
        }

        Ok(())
    }

    /// Entry count, entries and next-IFD offset
    fn calculate_ifd_size(ifd: &IFD, is_big_tiff: bool) -> u64 {
        let entries_count = ifd.entries.len() as u64;
        if is_big_tiff {
            8 + (20 * entries_count) + 8
        } else {
            2 + (12 * entries_count) + 4
        }
    }

    fn write_first_ifd_offset(writer: &mut (impl Write + Seek), offset: u64, is_big_tiff: bool) -> TiffResult<()> {
        let position = if is_big_tiff { 8 } else { 4 };
        writer.seek(SeekFrom::Start(position))?;
        Self::write_offset(writer, offset, is_big_tiff)
    }

    fn write_offset(writer: &mut impl Write, value: u64, is_big_tiff: bool) -> TiffResult<()> {
        if is_big_tiff {
            writer.write_all(&value.to_le_bytes())?;
        } else {
            writer.write_all(&(value as u32).to_le_bytes())?;
        }
        Ok(())
    }

    fn write_ifds(
        writer: &mut (impl Write + Seek),
        sorted_ifds: &[IFD],
        layout: &Layout,
        is_big_tiff: bool
    ) -> TiffResult<()> {
        for (i, ifd) in sorted_ifds.iter().enumerate() {
            let next_ifd_offset = layout.ifd_offsets.get(i + 1).copied().unwrap_or(0);
            writer.seek(SeekFrom::Start(layout.ifd_offsets[i]))?;
            Self::write_ifd(writer, ifd, next_ifd_offset, &layout.tag_data_offsets, i, is_big_tiff)?;
        }

        Ok(())
    }

    fn write_external_data(
        writer: &mut (impl Write + Seek),
        external_data: &ExternalData,
        tag_data_offsets: &BTreeMap<(usize, u16), u64>
    ) -> TiffResult<()> {
        for (key, data) in external_data {
            if let Some(offset) = tag_data_offsets.get(key) {
                writer.seek(SeekFrom::Start(*offset))?;
                writer.write_all(data)?;
                write_utils::write_padding(writer, data.len())?;
            }
        }

        Ok(())
    }

    fn write_image_data(
        writer: &mut (impl Write + Seek),
        image_data: &BTreeMap<usize, Vec<u8>>,
        tag_data_offsets: &BTreeMap<(usize, u16), u64>
    ) -> TiffResult<()> {
        for (ifd_index, data) in image_data {
            let offset = [tags::STRIP_OFFSETS, tags::TILE_OFFSETS]
                .iter()
                .find_map(|&tag| tag_data_offsets.get(&(*ifd_index, tag)))
                .copied();

            if let Some(file_offset) = offset {
                writer.seek(SeekFrom::Start(file_offset))?;
                writer.write_all(data)?;
                write_utils::write_padding(writer, data.len())?;
            }
        }

        Ok(())
    }

    /// Inline values are written little-endian packed, as the reader expects
    fn write_ifd(
        writer: &mut (impl Write + Seek),
        ifd: &IFD,
        next_offset: u64,
        tag_offsets: &BTreeMap<(usize, u16), u64>,
        ifd_index: usize,
        is_big_tiff: bool
    ) -> TiffResult<()> {
        if is_big_tiff {
            writer.write_all(&(ifd.entries.len() as u64).to_le_bytes())?;
        } else {
            writer.write_all(&(ifd.entries.len() as u16).to_le_bytes())?;
        }

        for entry in &ifd.entries {
            let value_offset = tag_offsets.get(&(ifd_index, entry.tag))
                .copied()
                .unwrap_or(entry.value_offset);

            writer.write_all(&entry.tag.to_le_bytes())?;
            writer.write_all(&entry.field_type.to_le_bytes())?;
            Self::write_offset(writer, entry.count, is_big_tiff)?;
            Self::write_offset(writer, value_offset, is_big_tiff)?;
        }

        Self::write_offset(writer, next_offset, is_big_tiff)
    }
}
