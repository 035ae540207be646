//! Mask rasters encoded as GeoTIFF
//!
//! Output is one 8-bit band in a single strip with the GeoKeys of the
//! raster's grid, GDAL_NODATA and a GDAL metadata block naming the band.

use log::{debug, info};
use std::io::{Seek, Write};

use crate::composite::Raster;
use crate::compression::CompressionFactory;
use crate::errors::{PipelineError, PipelineResult};
use crate::tiff::{TiffBuilder, IFD};
use crate::utils::xml_utils::GdalMetadataItem;

/// Builds the TIFF structure for a raster
///
/// BigTIFF is chosen when the compressed strip would not fit 32-bit offsets.
pub fn build_geotiff(raster: &Raster, compression: &str) -> PipelineResult<TiffBuilder> {
    let handler = CompressionFactory::get_handler_by_name(compression)?;
    let strip = handler.compress(&raster.values)?;
    debug!(
        "{} compressed {} bytes to {} bytes",
        handler.name(),
        raster.values.len(),
        strip.len()
    );

    let is_big_tiff = TiffBuilder::needs_big_tiff(strip.len() as u64);
    let mut builder = TiffBuilder::new(is_big_tiff);
    let ifd = builder.add_ifd(IFD::new(0, 0));

    let width = u32::try_from(raster.grid.width).map_err(|_| too_large(raster))?;
    let height = u32::try_from(raster.grid.height).map_err(|_| too_large(raster))?;
    builder.add_basic_gray_tags(ifd, width, height, 8, handler.code())?;
    if let Some((min, max)) = raster.value_range() {
        builder.add_sample_range(ifd, min as u16, max as u16)?;
    }
    builder.setup_single_strip(ifd, strip)?;
    builder.add_georeference(ifd, &raster.grid.to_georeference())?;
    builder.add_nodata_tag(ifd, raster.nodata as u16)?;
    builder.add_gdal_metadata_tag(ifd, &[GdalMetadataItem::band_description(0, &raster.band_name)])?;

    Ok(builder)
}

fn too_large(raster: &Raster) -> PipelineError {
    PipelineError::InvalidParameter(format!(
        "{}x{} raster exceeds the TIFF dimension range",
        raster.grid.width, raster.grid.height
    ))
}

/// Encodes a raster into any seekable sink
///
/// # Arguments
/// * `raster` - 8-bit raster to write
/// * `compression` - Codec name (`none`, `deflate` or `zstd`)
/// * `writer` - Destination
///
/// # Returns
/// Whether BigTIFF was used
pub fn write_geotiff(raster: &Raster, compression: &str, writer: &mut (impl Write + Seek)) -> PipelineResult<bool> {
    let builder = build_geotiff(raster, compression)?;
    builder.write_to(writer)?;
    info!(
        "Wrote {}x{} '{}' raster ({}, {})",
        raster.grid.width,
        raster.grid.height,
        raster.band_name,
        compression,
        if builder.is_big_tiff() { "BigTIFF" } else { "TIFF" }
    );
    Ok(builder.is_big_tiff())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::{RasterKind, NODATA};
    use crate::coordinate::GeoGrid;
    use crate::tiff::constants::tags;
    use crate::tiff::geo_keys::read_georeference;
    use crate::tiff::{RasterReader, TiffReader};
    use crate::utils::xml_utils::read_gdal_metadata;
    use std::io::Cursor;

    #[test]
    fn mask_reads_back_with_georeference_and_band_name() {
        let grid = GeoGrid {
            epsg: 4326,
            origin_x: 91.5,
            origin_y: 29.5,
            pixel_width: 0.5,
            pixel_height: 0.5,
            width: 3,
            height: 2,
        };
        let raster = Raster::new(grid, "crop_area", RasterKind::Mask { target: 4 }, vec![0, 1, NODATA, 1, 0, 0]).unwrap();

        let mut cursor = Cursor::new(Vec::new());
        let big = write_geotiff(&raster, "deflate", &mut cursor).unwrap();
        assert!(!big);

        let mut reader = TiffReader::new();
        let tiff = reader.read(&mut cursor).unwrap();
        let ifd = tiff.main_ifd().unwrap();
        let band = RasterReader::new(&mut cursor, ifd, &reader).read_band().unwrap();
        assert_eq!(band.values, vec![0, 1, 255, 1, 0, 0]);

        let georef = read_georeference(&reader, &mut cursor, ifd).unwrap();
        assert_eq!(GeoGrid::from_georeference(&georef, 3, 2), grid);

        let xml = reader.read_ascii(&mut cursor, ifd, tags::GDAL_METADATA).unwrap();
        assert_eq!(read_gdal_metadata(&xml).unwrap()[0].value, "crop_area");
        assert_eq!(ifd.get_tag_value(tags::MAX_SAMPLE_VALUE), Some(1));
    }

    #[test]
    fn unknown_codecs_are_rejected() {
        let grid = GeoGrid {
            epsg: 4326,
            origin_x: 0.0,
            origin_y: 0.0,
            pixel_width: 1.0,
            pixel_height: 1.0,
            width: 1,
            height: 1,
        };
        let raster = Raster::new(grid, "crop_area", RasterKind::Classes, vec![0]).unwrap();
        assert!(build_geotiff(&raster, "jpeg").is_err());
    }
}
