//! Label images: header metadata and band loading

use chrono::NaiveDate;
use log::{debug, trace, warn};
use std::path::{Path, PathBuf};

use crate::coordinate::{BoundingBox, CoordinateSystem, CoordinateSystemFactory, CoordinateTransformer, GeoGrid, Point};
use crate::errors::PipelineResult;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::tags;
use crate::tiff::geo_keys::read_georeference;
use crate::tiff::{BandData, RasterReader, TiffError, TiffReader, IFD};

/// One acquisition of the collection, described from its GeoTIFF header
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub id: String,
    pub date: NaiveDate,
    pub path: PathBuf,
    pub grid: GeoGrid,
    pub crs: CoordinateSystem,
    /// Label value that marks missing observations
    pub nodata: Option<u16>,
    /// Extent in EPSG:4326
    pub footprint: BoundingBox,
}

impl ImageRecord {
    /// Reads the header of a label GeoTIFF; pixels stay on disk
    ///
    /// # Arguments
    /// * `id` - Image identifier
    /// * `date` - Acquisition date
    /// * `path` - GeoTIFF file
    ///
    /// # Returns
    /// The record with grid, CRS, nodata and EPSG:4326 footprint, or an error if
    /// the file is not a georeferenced single-band raster
    pub fn open(id: &str, date: NaiveDate, path: &Path) -> PipelineResult<Self> {
        let mut tiff_reader = TiffReader::new();
        let mut file = TiffReader::open(path)?;
        let tiff = tiff_reader.read(&mut file)?;
        trace!("{}", tiff);
        let ifd = tiff.main_ifd().ok_or(TiffError::NoImageDirectory)?;

        let (width, height) = ifd.get_dimensions().ok_or(TiffError::MissingDimensions)?;
        let georef = read_georeference(&tiff_reader, &mut file, ifd)?;
        let grid = GeoGrid::from_georeference(&georef, width as usize, height as usize);
        let crs = CoordinateSystemFactory::from_epsg(georef.epsg)?;
        let nodata = read_nodata(&tiff_reader, &mut file, ifd)?;

        let footprint =
            CoordinateTransformer.transform_bbox(&grid.bbox(), &crs, &CoordinateSystem::WGS84)?;

        debug!(
            "Image {} ({}): {}x{} in {}, nodata {:?}",
            id,
            date,
            grid.width,
            grid.height,
            crs.description(),
            nodata
        );

        Ok(ImageRecord {
            id: id.to_string(),
            date,
            path: path.to_path_buf(),
            grid,
            crs,
            nodata,
            footprint,
        })
    }

    /// Decodes the label band
    pub fn load_band(&self) -> PipelineResult<LabelBand> {
        let mut tiff_reader = TiffReader::new();
        let mut file = TiffReader::open(&self.path)?;
        let tiff = tiff_reader.read(&mut file)?;
        let ifd = tiff.main_ifd().ok_or(TiffError::NoImageDirectory)?;

        let band = RasterReader::new(&mut file, ifd, &tiff_reader).read_band()?;
        if band.width != self.grid.width || band.height != self.grid.height {
            return Err(TiffError::GenericError(format!(
                "{} changed size since it was catalogued",
                self.path.display()
            ))
            .into());
        }

        Ok(LabelBand { grid: self.grid, crs: self.crs, nodata: self.nodata, band })
    }
}

/// GDAL_NODATA as a label value; values that are not labels are ignored
fn read_nodata(tiff_reader: &TiffReader, file: &mut dyn SeekableReader, ifd: &IFD) -> PipelineResult<Option<u16>> {
    if !ifd.has_tag(tags::GDAL_NODATA) {
        return Ok(None);
    }

    let text = tiff_reader.read_ascii(file, ifd, tags::GDAL_NODATA)?;
    match text.trim().parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && (0.0..=u16::MAX as f64).contains(&v) => Ok(Some(v as u16)),
        _ => {
            warn!("Ignoring GDAL_NODATA value '{}'", text.trim());
            Ok(None)
        }
    }
}

/// A decoded label band with its placement
#[derive(Debug, Clone)]
pub struct LabelBand {
    pub grid: GeoGrid,
    pub crs: CoordinateSystem,
    pub nodata: Option<u16>,
    pub band: BandData,
}

impl LabelBand {
    /// Label of the pixel containing `point` (map units of `crs`)
    ///
    /// None outside the image and at nodata pixels.
    pub fn sample(&self, point: &Point) -> Option<u16> {
        let (col, row) = self.grid.to_pixel(point)?;
        let value = self.band.get(col, row)?;
        if Some(value) == self.nodata {
            None
        } else {
            Some(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(nodata: Option<u16>) -> LabelBand {
        LabelBand {
            grid: GeoGrid {
                epsg: 4326,
                origin_x: 10.0,
                origin_y: 20.0,
                pixel_width: 1.0,
                pixel_height: 1.0,
                width: 2,
                height: 2,
            },
            crs: CoordinateSystem::WGS84,
            nodata,
            band: BandData { width: 2, height: 2, values: vec![1, 2, 3, 0] },
        }
    }

    #[test]
    fn sampling_uses_the_containing_pixel() {
        let b = band(None);
        assert_eq!(b.sample(&Point::new(10.2, 19.9)), Some(1));
        assert_eq!(b.sample(&Point::new(11.9, 18.1)), Some(0));
        assert_eq!(b.sample(&Point::new(12.1, 19.0)), None);
    }

    #[test]
    fn nodata_pixels_are_not_observations() {
        let b = band(Some(0));
        assert_eq!(b.sample(&Point::new(11.5, 18.5)), None);
        assert_eq!(b.sample(&Point::new(11.5, 19.5)), Some(2));
    }
}
