//! GeoTIFF tag strategies
//!
//! The three tags that place a north-up raster on the map: pixel scale,
//! a single tiepoint at the top-left corner, and the GeoKey directory.

use log::info;

use crate::tiff::constants::{field_types, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::geo_keys::{GeoKeyDirectory, GeoReference};
use crate::tiff::ifd::IFD;
use crate::utils::tiff_utils::{self, ExternalData};

/// Handles GeoTIFF tags
pub struct GeoTagsBuilder;

impl GeoTagsBuilder {
    /// Georeference an IFD
    ///
    /// # Arguments
    /// * `ifd` - IFD receiving the tags
    /// * `external_data` - Writer's out-of-line tag storage
    /// * `ifd_index` - Index of `ifd` in the file
    /// * `georef` - CRS, top-left corner and pixel size of the raster
    pub fn add_georeference(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        georef: &GeoReference
    ) -> TiffResult<()> {
        info!("Adding GeoTIFF tags for EPSG:{}", georef.epsg);

        if georef.pixel_width <= 0.0 || georef.pixel_height <= 0.0 {
            return Err(TiffError::GenericError(format!(
                "Pixel size must be positive, got {}x{}",
                georef.pixel_width, georef.pixel_height
            )));
        }

        // Z scale 0: the raster carries no elevation
        let pixel_scale = [georef.pixel_width, georef.pixel_height, 0.0];
        tiff_utils::create_external_tag(
            ifd,
            external_data,
            ifd_index,
            tags::MODEL_PIXEL_SCALE_TAG,
            field_types::DOUBLE,
            3,
            tiff_utils::f64s_to_le_bytes(&pixel_scale),
        );

        let tiepoint = [0.0, 0.0, 0.0, georef.origin_x, georef.origin_y, 0.0];
        tiff_utils::create_external_tag(
            ifd,
            external_data,
            ifd_index,
            tags::MODEL_TIEPOINT_TAG,
            field_types::DOUBLE,
            6,
            tiff_utils::f64s_to_le_bytes(&tiepoint),
        );

        let directory = GeoKeyDirectory::for_epsg(georef.epsg)?.to_shorts();
        tiff_utils::create_external_tag(
            ifd,
            external_data,
            ifd_index,
            tags::GEO_KEY_DIRECTORY_TAG,
            field_types::SHORT,
            directory.len() as u64,
            tiff_utils::u16s_to_le_bytes(&directory),
        );

        Ok(())
    }
}
