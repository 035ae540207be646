//! Metadata tag strategies
//!
//! GDAL's private tags: the nodata marker (42113) and the XML metadata
//! block (42112) that carries band names.

use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::constants::{tags, field_types};
use crate::tiff::errors::TiffResult;
use crate::utils::tiff_utils::{self, ExternalData};
use crate::utils::xml_utils::{self, GdalMetadataItem};
use log::{debug, info};

/// Handles metadata tags in TIFF files
pub struct MetadataBuilder;

impl MetadataBuilder {
    /// Add a GDAL NoData tag
    ///
    /// GDAL stores the marker as a NUL-terminated ASCII number. Short values
    /// such as "255" fit inside the entry itself.
    pub fn add_nodata_tag(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        nodata_value: u16,
        is_big_tiff: bool
    ) {
        info!("Adding GDAL NoData tag: {}", nodata_value);

        let bytes = tiff_utils::ascii_bytes(&nodata_value.to_string());
        let inline_size = if is_big_tiff { 8 } else { 4 };
        debug!("NoData bytes: {:?}", bytes);

        if bytes.len() <= inline_size {
            let mut packed = [0u8; 8];
            packed[..bytes.len()].copy_from_slice(&bytes);
            tiff_utils::create_inline_tag(
                ifd,
                external_data,
                ifd_index,
                IFDEntry::new(tags::GDAL_NODATA, field_types::ASCII, bytes.len() as u64, u64::from_le_bytes(packed)),
            );
        } else {
            let count = bytes.len() as u64;
            tiff_utils::create_external_tag(ifd, external_data, ifd_index, tags::GDAL_NODATA, field_types::ASCII, count, bytes);
        }
    }

    /// Add a GDAL metadata block built from `items`
    pub fn add_gdal_metadata_tag(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        items: &[GdalMetadataItem]
    ) -> TiffResult<()> {
        info!("Adding GDAL metadata tag with {} items", items.len());

        let xml = xml_utils::write_gdal_metadata(items)?;
        let bytes = tiff_utils::ascii_bytes(&xml);
        let count = bytes.len() as u64;
        tiff_utils::create_external_tag(ifd, external_data, ifd_index, tags::GDAL_METADATA, field_types::ASCII, count, bytes);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_nodata_is_stored_inline() {
        let mut ifd = IFD::new(0, 0);
        let mut external = ExternalData::new();
        MetadataBuilder::add_nodata_tag(&mut ifd, &mut external, 0, 255, false);

        let entry = ifd.get_entry(tags::GDAL_NODATA).unwrap();
        assert_eq!(entry.count, 4);
        assert_eq!(entry.value_offset.to_le_bytes()[..4], *b"255\0");
        assert!(external.is_empty());
    }

    #[test]
    fn long_nodata_goes_out_of_line() {
        let mut ifd = IFD::new(0, 0);
        let mut external = ExternalData::new();
        MetadataBuilder::add_nodata_tag(&mut ifd, &mut external, 0, 65535, false);

        assert_eq!(ifd.get_entry(tags::GDAL_NODATA).unwrap().count, 6);
        assert_eq!(external.get(&(0, tags::GDAL_NODATA)).unwrap(), &b"65535\0".to_vec());
    }
}
