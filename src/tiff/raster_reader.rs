//! Band data extraction for label rasters
//!
//! Reads the single band of an 8 or 16 bit label GeoTIFF into memory,
//! whether it is organised in strips or tiles. Decompression goes through
//! the compression factory and the horizontal predictor is undone per row.

use log::{debug, trace};
use std::io::SeekFrom;

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{predictor, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiff::validation;

/// Decoded band of a label raster, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandData {
    pub width: usize,
    pub height: usize,
    pub values: Vec<u16>,
}

impl BandData {
    /// Value at a pixel, or None when outside the band
    pub fn get(&self, col: usize, row: usize) -> Option<u16> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.values.get(row * self.width + col).copied()
    }
}

/// Reads the first band of an IFD
pub struct RasterReader<'a> {
    reader: &'a mut dyn SeekableReader,
    ifd: &'a IFD,
    tiff_reader: &'a TiffReader,
}

impl<'a> RasterReader<'a> {
    pub fn new(reader: &'a mut dyn SeekableReader, ifd: &'a IFD, tiff_reader: &'a TiffReader) -> Self {
        RasterReader { reader, ifd, tiff_reader }
    }

    /// Reads the whole band
    ///
    /// # Returns
    /// The decoded values, or an error if the layout is not a single 8 or
    /// 16 bit band or a chunk cannot be read.
    pub fn read_band(&mut self) -> TiffResult<BandData> {
        let (width, height) = self.ifd.get_dimensions().ok_or(TiffError::MissingDimensions)?;
        let (width, height) = (width as usize, height as usize);

        let bits_per_sample = self.ifd.get_bits_per_sample();
        let samples_per_pixel = self.ifd.get_samples_per_pixel();
        if samples_per_pixel != 1 || !(bits_per_sample == 8 || bits_per_sample == 16) {
            return Err(TiffError::UnsupportedSampleLayout { bits_per_sample, samples_per_pixel });
        }

        let compression_handler = CompressionFactory::create_handler(self.ifd.get_compression())?;
        let predictor = self.ifd.get_tag_value(tags::PREDICTOR).unwrap_or(predictor::NONE as u64);
        debug!(
            "Reading {}x{} band: {} bits, {}, predictor {}",
            width, height, bits_per_sample, compression_handler.name(), predictor
        );

        let layout = ChunkLayout {
            bytes_per_sample: (bits_per_sample / 8) as usize,
            predictor,
            compression: compression_handler.as_ref(),
        };

        let mut values = vec![0u16; width * height];
        if self.ifd.is_tiled() {
            self.read_tiles(&layout, width, height, &mut values)?;
        } else {
            self.read_strips(&layout, width, height, &mut values)?;
        }

        Ok(BandData { width, height, values })
    }

    fn chunk_locations(&mut self, offsets_tag: u16, counts_tag: u16) -> TiffResult<Vec<(u64, u64)>> {
        let offsets = self.tiff_reader.read_tag_values(self.reader, self.ifd, offsets_tag)?;
        let counts = self.tiff_reader.read_tag_values(self.reader, self.ifd, counts_tag)?;

        if offsets.len() != counts.len() {
            return Err(TiffError::GenericError(format!(
                "Chunk table mismatch: {} offsets, {} byte counts",
                offsets.len(),
                counts.len()
            )));
        }
        Ok(offsets.into_iter().zip(counts).collect())
    }

    fn read_strips(&mut self, layout: &ChunkLayout, width: usize, height: usize, values: &mut [u16]) -> TiffResult<()> {
        let rows_per_strip = self
            .ifd
            .get_tag_value(tags::ROWS_PER_STRIP)
            .map(|rows| (rows as usize).clamp(1, height.max(1)))
            .unwrap_or(height.max(1));
        let strips = self.chunk_locations(tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)?;
        trace!("{} strips of {} rows", strips.len(), rows_per_strip);
        if strips.len() * rows_per_strip < height {
            return Err(TiffError::GenericError(format!(
                "{} strips of {} rows cannot cover {} rows",
                strips.len(),
                rows_per_strip,
                height
            )));
        }

        for (index, (offset, byte_count)) in strips.into_iter().enumerate() {
            let first_row = index * rows_per_strip;
            if first_row >= height {
                break;
            }
            let rows = rows_per_strip.min(height - first_row);

            let samples = self.read_chunk(layout, offset, byte_count, width, rows)?;
            let start = first_row * width;
            let len = rows * width;
            values[start..start + len].copy_from_slice(&samples[..len]);
        }

        Ok(())
    }

    fn read_tiles(&mut self, layout: &ChunkLayout, width: usize, height: usize, values: &mut [u16]) -> TiffResult<()> {
        let tile_width = self.ifd.get_tag_value(tags::TILE_WIDTH).unwrap_or(256) as usize;
        let tile_height = self.ifd.get_tag_value(tags::TILE_LENGTH).unwrap_or(256) as usize;
        if tile_width == 0 || tile_height == 0 {
            return Err(TiffError::GenericError("Zero tile dimension".to_string()));
        }

        let tiles_across = width.div_ceil(tile_width);
        let tiles = self.chunk_locations(tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)?;
        trace!("{} tiles of {}x{}", tiles.len(), tile_width, tile_height);
        let tiles_needed = tiles_across * height.div_ceil(tile_height);
        if tiles.len() < tiles_needed {
            return Err(TiffError::GenericError(format!(
                "{} tiles present, {} needed for {}x{}",
                tiles.len(),
                tiles_needed,
                width,
                height
            )));
        }

        for (index, (offset, byte_count)) in tiles.into_iter().enumerate() {
            let tile_x = (index % tiles_across) * tile_width;
            let tile_y = (index / tiles_across) * tile_height;
            if tile_y >= height {
                break;
            }

            let samples = self.read_chunk(layout, offset, byte_count, tile_width, tile_height)?;

            // Edge tiles are padded to the full tile size
            let copy_width = tile_width.min(width - tile_x);
            let copy_height = tile_height.min(height - tile_y);
            for row in 0..copy_height {
                let src = row * tile_width;
                let dst = (tile_y + row) * width + tile_x;
                values[dst..dst + copy_width].copy_from_slice(&samples[src..src + copy_width]);
            }
        }

        Ok(())
    }

    /// Reads, decompresses and un-predicts one strip or tile
    fn read_chunk(&mut self, layout: &ChunkLayout, offset: u64, byte_count: u64, row_width: usize, rows: usize) -> TiffResult<Vec<u16>> {
        let file_size = validation::get_file_size(self.reader)?;
        validation::validate_data_range(offset, byte_count, file_size, "Image chunk")?;

        self.reader.seek(SeekFrom::Start(offset))?;
        let mut compressed = vec![0u8; byte_count as usize];
        self.reader.read_exact(&mut compressed)?;
        let raw = layout.compression.decompress(&compressed)?;

        let mut samples: Vec<u16> = if layout.bytes_per_sample == 2 {
            let handler = self
                .tiff_reader
                .byte_order_handler()
                .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))?;
            handler.decode_u16_samples(&raw)
        } else {
            raw.iter().map(|&b| b as u16).collect()
        };

        // A short chunk would leave pixels at 0, which is a real class
        let expected = row_width * rows;
        if samples.len() < expected {
            return Err(TiffError::TruncatedChunk { offset, expected, actual: samples.len() });
        }

        if layout.predictor == predictor::HORIZONTAL_DIFFERENCING as u64 {
            apply_horizontal_predictor(&mut samples, row_width, rows, layout.bytes_per_sample);
        }

        Ok(samples)
    }
}

struct ChunkLayout<'h> {
    bytes_per_sample: usize,
    predictor: u64,
    compression: &'h dyn CompressionHandler,
}

/// Undo horizontal differencing, wrapping at the sample width
pub fn apply_horizontal_predictor(samples: &mut [u16], width: usize, rows: usize, bytes_per_sample: usize) {
    let mask: u32 = if bytes_per_sample == 1 { 0xFF } else { 0xFFFF };
    for row in 0..rows {
        let start = row * width;
        let end = (start + width).min(samples.len());
        for i in (start + 1)..end {
            samples[i] = ((samples[i] as u32 + samples[i - 1] as u32) & mask) as u16;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predictor_wraps_eight_bit_rows_independently() {
        let mut samples = vec![250, 10, 1, 5, 1, 1];
        apply_horizontal_predictor(&mut samples, 3, 2, 1);
        assert_eq!(samples, vec![250, 4, 5, 5, 6, 7]);
    }

    #[test]
    fn band_lookup_is_bounds_checked() {
        let band = BandData { width: 2, height: 1, values: vec![3, 4] };
        assert_eq!(band.get(1, 0), Some(4));
        assert_eq!(band.get(2, 0), None);
        assert_eq!(band.get(0, 1), None);
    }
}
