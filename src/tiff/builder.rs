//! TIFF file construction
//!
//! `TiffBuilder` collects IFDs, out-of-line tag data and strip data, then
//! hands them to the writer. The tag builders in `builders/` each own one
//! family of tags.

use std::collections::BTreeMap;
use std::io::{Seek, Write};
use std::path::Path;
use log::{error, info};

use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::geo_keys::GeoReference;
use crate::tiff::ifd::IFD;
use crate::utils::tiff_utils::ExternalData;
use crate::utils::xml_utils::GdalMetadataItem;

use crate::tiff::builders::basic_tags::BasicTagsBuilder;
use crate::tiff::builders::geo_tags::GeoTagsBuilder;
use crate::tiff::builders::metadata_tags::MetadataBuilder;
use crate::tiff::builders::writer::WriterBuilder;

/// Headroom left below the 4 GiB limit for IFDs and tag data
const CLASSIC_TIFF_HEADROOM: u64 = 1024 * 1024;

/// Builder for creating TIFF files
pub struct TiffBuilder {
    is_big_tiff: bool,
    pub ifds: Vec<IFD>,
    image_data: BTreeMap<usize, Vec<u8>>,
    external_data: ExternalData,
}

impl TiffBuilder {
    /// Create a new TIFF builder
    pub fn new(is_big_tiff: bool) -> Self {
        info!("Creating new TiffBuilder (is_big_tiff: {})", is_big_tiff);
        TiffBuilder {
            is_big_tiff,
            ifds: Vec::new(),
            image_data: BTreeMap::new(),
            external_data: ExternalData::new(),
        }
    }

    /// Whether a file holding `image_bytes` of pixel data needs BigTIFF
    pub fn needs_big_tiff(image_bytes: u64) -> bool {
        image_bytes + CLASSIC_TIFF_HEADROOM > u32::MAX as u64
    }

    /// Whether this builder writes BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Add an IFD to the TIFF
    pub fn add_ifd(&mut self, ifd: IFD) -> usize {
        let ifd_index = self.ifds.len();
        info!("Adding IFD #{} to TiffBuilder", ifd_index);
        self.ifds.push(ifd);
        ifd_index
    }

    fn ifd_mut(&mut self, ifd_index: usize) -> TiffResult<&mut IFD> {
        let count = self.ifds.len();
        self.ifds.get_mut(ifd_index).ok_or_else(|| {
            error!("Invalid IFD index {}, only have {} IFDs", ifd_index, count);
            TiffError::GenericError(format!("Invalid IFD index {}, only have {} IFDs", ifd_index, count))
        })
    }

    /// Add the tags of a single-band grayscale image
    pub fn add_basic_gray_tags(
        &mut self,
        ifd_index: usize,
        width: u32,
        height: u32,
        bits_per_sample: u16,
        compression: u16
    ) -> TiffResult<()> {
        let ifd = self.ifd_mut(ifd_index)?;
        BasicTagsBuilder::add_basic_gray_tags(ifd, width, height, bits_per_sample, compression);
        Ok(())
    }

    /// Record the band's value range
    pub fn add_sample_range(&mut self, ifd_index: usize, min: u16, max: u16) -> TiffResult<()> {
        BasicTagsBuilder::add_sample_range(self.ifd_mut(ifd_index)?, min, max);
        Ok(())
    }

    /// Set up a single strip holding already-compressed band data
    pub fn setup_single_strip(&mut self, ifd_index: usize, strip_data: Vec<u8>) -> TiffResult<()> {
        let is_big_tiff = self.is_big_tiff;
        let ifd = self.ifds.get_mut(ifd_index)
            .ok_or_else(|| TiffError::GenericError(format!("Invalid IFD index {}", ifd_index)))?;

        BasicTagsBuilder::setup_single_strip(ifd, &mut self.image_data, ifd_index, strip_data, is_big_tiff);
        Ok(())
    }

    /// Add pixel scale, tiepoint and GeoKey directory
    pub fn add_georeference(&mut self, ifd_index: usize, georef: &GeoReference) -> TiffResult<()> {
        let ifd = self.ifds.get_mut(ifd_index)
            .ok_or_else(|| TiffError::GenericError(format!("Invalid IFD index {}", ifd_index)))?;

        GeoTagsBuilder::add_georeference(ifd, &mut self.external_data, ifd_index, georef)
    }

    /// Add a GDAL NoData tag
    pub fn add_nodata_tag(&mut self, ifd_index: usize, nodata_value: u16) -> TiffResult<()> {
        let is_big_tiff = self.is_big_tiff;
        let ifd = self.ifds.get_mut(ifd_index)
            .ok_or_else(|| TiffError::GenericError(format!("Invalid IFD index {}", ifd_index)))?;

        MetadataBuilder::add_nodata_tag(ifd, &mut self.external_data, ifd_index, nodata_value, is_big_tiff);
        Ok(())
    }

    /// Add a GDAL metadata block
    pub fn add_gdal_metadata_tag(&mut self, ifd_index: usize, items: &[GdalMetadataItem]) -> TiffResult<()> {
        let ifd = self.ifds.get_mut(ifd_index)
            .ok_or_else(|| TiffError::GenericError(format!("Invalid IFD index {}", ifd_index)))?;

        MetadataBuilder::add_gdal_metadata_tag(ifd, &mut self.external_data, ifd_index, items)
    }

    /// Write the TIFF file to disk
    pub fn write(&self, output_path: &Path) -> TiffResult<()> {
        WriterBuilder::write(
            self.is_big_tiff,
            &self.ifds,
            &self.image_data,
            &self.external_data,
            output_path
        )
    }

    /// Write the TIFF into any seekable sink, such as an in-memory cursor
    pub fn write_to(&self, writer: &mut (impl Write + Seek)) -> TiffResult<()> {
        WriterBuilder::write_to(
            writer,
            self.is_big_tiff,
            &self.ifds,
            &self.image_data,
            &self.external_data
        )
    }
}
