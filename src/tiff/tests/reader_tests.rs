//! Reader tests over hand-assembled files

use crate::compression::{AdobeDeflateHandler, CompressionHandler};
use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::{compression, field_types as ft, geo_keys, predictor, tags};
use crate::tiff::geo_keys::read_georeference;
use crate::tiff::raster_reader::RasterReader;
use crate::tiff::reader::TiffReader;
use crate::tiff::TiffError;

use super::test_utils::{assemble, RawEntry};

fn gray_entries(width: u64, height: u64, bits: u64) -> Vec<RawEntry> {
    vec![
        RawEntry::new(tags::IMAGE_WIDTH, ft::LONG, &[width]),
        RawEntry::new(tags::IMAGE_LENGTH, ft::LONG, &[height]),
        RawEntry::new(tags::BITS_PER_SAMPLE, ft::SHORT, &[bits]),
        RawEntry::new(tags::SAMPLES_PER_PIXEL, ft::SHORT, &[1]),
    ]
}

#[test]
fn big_endian_strips_with_inline_short_counts() {
    let mut entries = gray_entries(4, 3, 8);
    entries.push(RawEntry::new(tags::ROWS_PER_STRIP, ft::SHORT, &[2]));
    entries.push(RawEntry::new(tags::STRIP_OFFSETS, ft::LONG, &[0, 0]));
    // Two SHORTs fit inline; in an MM file the first sits in the high half
    entries.push(RawEntry::new(tags::STRIP_BYTE_COUNTS, ft::SHORT, &[8, 4]));

    let chunks = vec![vec![0, 1, 2, 3, 4, 5, 6, 7], vec![8, 4, 4, 8]];
    let mut cursor = assemble(ByteOrder::BigEndian, false, entries, &chunks, tags::STRIP_OFFSETS);

    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    assert_eq!(tiff.byte_order, ByteOrder::BigEndian);
    let ifd = tiff.main_ifd().unwrap();

    assert_eq!(ifd.get_dimensions(), Some((4, 3)));
    assert_eq!(reader.read_tag_values(&mut cursor, ifd, tags::STRIP_BYTE_COUNTS).unwrap(), vec![8, 4]);

    let band = RasterReader::new(&mut cursor, ifd, &reader).read_band().unwrap();
    assert_eq!(band.values, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 4, 4, 8]);
}

#[test]
fn bigtiff_tiles_are_cropped_at_the_edges() {
    let mut entries = gray_entries(5, 3, 16);
    entries.push(RawEntry::new(tags::TILE_WIDTH, ft::SHORT, &[4]));
    entries.push(RawEntry::new(tags::TILE_LENGTH, ft::SHORT, &[2]));
    entries.push(RawEntry::new(tags::TILE_OFFSETS, ft::LONG8, &[0, 0, 0, 0]));
    entries.push(RawEntry::new(tags::TILE_BYTE_COUNTS, ft::LONG8, &[16, 16, 16, 16]));

    // Tile pixel value = 100 * tile index + position inside the tile
    let chunks: Vec<Vec<u8>> = (0..4u16)
        .map(|t| (0..8u16).flat_map(|p| (t * 100 + p).to_le_bytes()).collect())
        .collect();
    let mut cursor = assemble(ByteOrder::LittleEndian, true, entries, &chunks, tags::TILE_OFFSETS);

    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    assert!(tiff.is_big_tiff);
    let ifd = tiff.main_ifd().unwrap();
    assert!(ifd.is_tiled());

    let band = RasterReader::new(&mut cursor, ifd, &reader).read_band().unwrap();
    assert_eq!(band.width, 5);
    assert_eq!(
        band.values,
        vec![
            0, 1, 2, 3, 100,
            4, 5, 6, 7, 104,
            200, 201, 202, 203, 300,
        ]
    );
}

#[test]
fn deflated_strip_with_horizontal_predictor() {
    let rows: Vec<u8> = vec![4, 4, 4, 1, 1, 6];
    let mut differenced = rows.clone();
    for row in differenced.chunks_mut(3) {
        for i in (1..3).rev() {
            row[i] = row[i].wrapping_sub(row[i - 1]);
        }
    }
    let strip = AdobeDeflateHandler::new().compress(&differenced).unwrap();

    let mut entries = gray_entries(3, 2, 8);
    entries.push(RawEntry::new(tags::COMPRESSION, ft::SHORT, &[compression::DEFLATE as u64]));
    entries.push(RawEntry::new(tags::PREDICTOR, ft::SHORT, &[predictor::HORIZONTAL_DIFFERENCING as u64]));
    entries.push(RawEntry::new(tags::STRIP_OFFSETS, ft::LONG, &[0]));
    entries.push(RawEntry::new(tags::STRIP_BYTE_COUNTS, ft::LONG, &[strip.len() as u64]));

    let mut cursor = assemble(ByteOrder::LittleEndian, false, entries, &[strip], tags::STRIP_OFFSETS);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let band = RasterReader::new(&mut cursor, &tiff.ifds[0], &reader).read_band().unwrap();
    assert_eq!(band.values, vec![4, 4, 4, 1, 1, 6]);
}

#[test]
fn rgb_rasters_are_rejected() {
    let mut entries = gray_entries(1, 1, 8);
    entries.retain(|e| e.tag != tags::SAMPLES_PER_PIXEL);
    entries.push(RawEntry::new(tags::SAMPLES_PER_PIXEL, ft::SHORT, &[3]));
    entries.push(RawEntry::new(tags::STRIP_OFFSETS, ft::LONG, &[0]));
    entries.push(RawEntry::new(tags::STRIP_BYTE_COUNTS, ft::LONG, &[3]));

    let mut cursor = assemble(ByteOrder::LittleEndian, false, entries, &[vec![1, 2, 3]], tags::STRIP_OFFSETS);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let err = RasterReader::new(&mut cursor, &tiff.ifds[0], &reader).read_band().unwrap_err();
    assert!(matches!(err, TiffError::UnsupportedSampleLayout { samples_per_pixel: 3, .. }));
}

#[test]
fn big_endian_georeference() {
    let mut entries = gray_entries(2, 2, 8);
    entries.push(RawEntry::new(tags::STRIP_OFFSETS, ft::LONG, &[0]));
    entries.push(RawEntry::new(tags::STRIP_BYTE_COUNTS, ft::LONG, &[4]));
    entries.push(RawEntry::new(tags::MODEL_PIXEL_SCALE_TAG, ft::DOUBLE, &[
        10.0f64.to_bits(), 10.0f64.to_bits(), 0.0f64.to_bits(),
    ]));
    entries.push(RawEntry::new(tags::MODEL_TIEPOINT_TAG, ft::DOUBLE, &[
        0.0f64.to_bits(), 0.0f64.to_bits(), 0.0f64.to_bits(),
        500_000.0f64.to_bits(), 3_100_000.0f64.to_bits(), 0.0f64.to_bits(),
    ]));
    entries.push(RawEntry::new(tags::GEO_KEY_DIRECTORY_TAG, ft::SHORT, &[
        1, 1, 0, 2,
        geo_keys::GT_MODEL_TYPE as u64, 0, 1, 1,
        geo_keys::PROJECTED_CS_TYPE as u64, 0, 1, 32646,
    ]));

    let mut cursor = assemble(ByteOrder::BigEndian, false, entries, &[vec![0; 4]], tags::STRIP_OFFSETS);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let georef = read_georeference(&reader, &mut cursor, &tiff.ifds[0]).unwrap();
    assert_eq!(georef.epsg, 32646);
    assert_eq!(georef.origin_x, 500_000.0);
    assert_eq!(georef.origin_y, 3_100_000.0);
    assert_eq!(georef.pixel_width, 10.0);
}

#[test]
fn missing_georeference_is_reported() {
    let mut entries = gray_entries(1, 1, 8);
    entries.push(RawEntry::new(tags::STRIP_OFFSETS, ft::LONG, &[0]));
    entries.push(RawEntry::new(tags::STRIP_BYTE_COUNTS, ft::LONG, &[1]));

    let mut cursor = assemble(ByteOrder::LittleEndian, false, entries, &[vec![0]], tags::STRIP_OFFSETS);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let err = read_georeference(&reader, &mut cursor, &tiff.ifds[0]).unwrap_err();
    assert!(matches!(err, TiffError::MissingGeoreference(_)));
}

#[test]
fn invalid_version_is_rejected() {
    let mut cursor = std::io::Cursor::new(vec![0x49, 0x49, 41, 0, 8, 0, 0, 0]);
    let err = TiffReader::new().read(&mut cursor).unwrap_err();
    assert!(matches!(err, TiffError::UnsupportedVersion(41)));
}

#[test]
fn short_strip_is_an_error_not_zero_fill() {
    let strip = AdobeDeflateHandler::new().compress(&[4, 4]).unwrap();

    let mut entries = gray_entries(2, 2, 8);
    entries.push(RawEntry::new(tags::COMPRESSION, ft::SHORT, &[compression::DEFLATE as u64]));
    entries.push(RawEntry::new(tags::STRIP_OFFSETS, ft::LONG, &[0]));
    entries.push(RawEntry::new(tags::STRIP_BYTE_COUNTS, ft::LONG, &[strip.len() as u64]));

    let mut cursor = assemble(ByteOrder::LittleEndian, false, entries, &[strip], tags::STRIP_OFFSETS);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let err = RasterReader::new(&mut cursor, &tiff.ifds[0], &reader).read_band().unwrap_err();
    assert!(matches!(err, TiffError::TruncatedChunk { expected: 4, actual: 2, .. }));
}

#[test]
fn missing_strips_are_an_error() {
    let mut entries = gray_entries(2, 4, 8);
    entries.push(RawEntry::new(tags::ROWS_PER_STRIP, ft::SHORT, &[2]));
    entries.push(RawEntry::new(tags::STRIP_OFFSETS, ft::LONG, &[0]));
    entries.push(RawEntry::new(tags::STRIP_BYTE_COUNTS, ft::LONG, &[4]));

    let mut cursor = assemble(ByteOrder::LittleEndian, false, entries, &[vec![4; 4]], tags::STRIP_OFFSETS);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let err = RasterReader::new(&mut cursor, &tiff.ifds[0], &reader).read_band().unwrap_err();
    assert!(matches!(err, TiffError::GenericError(_)));
}
