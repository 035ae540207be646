//! Export parameters and output grid planning

use log::debug;
use serde::Deserialize;

use crate::boundary::Region;
use crate::compression::CompressionFactory;
use crate::coordinate::{CoordinateSystem, CoordinateSystemFactory, CoordinateTransformer, GeoGrid, METRES_PER_DEGREE};
use crate::errors::{PipelineError, PipelineResult};

/// Pixel ceiling applied when an export sets none
pub const DEFAULT_MAX_PIXELS: u64 = 10_000_000_000;
pub const DEFAULT_CRS_EPSG: u32 = 4326;
pub const DEFAULT_COMPRESSION: &str = "deflate";

fn default_crs() -> u32 {
    DEFAULT_CRS_EPSG
}

fn default_max_pixels() -> u64 {
    DEFAULT_MAX_PIXELS
}

fn default_compression() -> String {
    DEFAULT_COMPRESSION.to_string()
}

/// One export request
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExportParams {
    /// Output name; the file is `<description>.tif`
    pub description: String,
    /// Pixel size in metres
    pub scale: f64,
    #[serde(default = "default_crs", rename = "crs")]
    pub crs_epsg: u32,
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
    #[serde(default = "default_compression")]
    pub compression: String,
}

impl ExportParams {
    /// EPSG:4326 export with the default ceiling and compression
    pub fn new(description: &str, scale: f64) -> Self {
        ExportParams {
            description: description.to_string(),
            scale,
            crs_epsg: DEFAULT_CRS_EPSG,
            max_pixels: DEFAULT_MAX_PIXELS,
            compression: DEFAULT_COMPRESSION.to_string(),
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        let name_ok = !self.description.trim().is_empty()
            && !self.description.contains(['/', '\\'])
            && self.description != "."
            && self.description != "..";
        if !name_ok {
            return Err(PipelineError::InvalidParameter(format!(
                "Export description '{}' is not a valid file name",
                self.description
            )));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "Export '{}' has scale {}, expected a positive number of metres",
                self.description, self.scale
            )));
        }
        if self.max_pixels == 0 {
            return Err(PipelineError::InvalidParameter(format!(
                "Export '{}' has a zero pixel ceiling",
                self.description
            )));
        }
        CompressionFactory::get_handler_by_name(&self.compression)?;
        CoordinateSystemFactory::from_epsg(self.crs_epsg)?;
        Ok(())
    }

    /// Pixel size in units of the output CRS
    ///
    /// Geographic output converts the metre scale at the equator.
    pub fn pixel_size(&self) -> PipelineResult<f64> {
        let crs = CoordinateSystemFactory::from_epsg(self.crs_epsg)?;
        Ok(if crs.is_geographic() { self.scale / METRES_PER_DEGREE } else { self.scale })
    }

    /// Output grid covering the region, checked against the ceiling
    ///
    /// # Arguments
    /// * `region` - Region whose bounding box the grid covers
    ///
    /// # Returns
    /// The grid in the export's CRS, or `ExportQuotaExceeded` when it would hold
    /// more than `max_pixels` pixels
    pub fn plan_grid(&self, region: &Region) -> PipelineResult<GeoGrid> {
        self.validate()?;
        let crs = CoordinateSystemFactory::from_epsg(self.crs_epsg)?;
        let bbox = CoordinateTransformer.transform_bbox(&region.bbox, &CoordinateSystem::WGS84, &crs)?;
        let pixel_size = self.pixel_size()?;

        // Counted in f64 first: a tiny scale can overflow usize and u64
        let columns = (bbox.width() / pixel_size).ceil().max(1.0);
        let rows = (bbox.height() / pixel_size).ceil().max(1.0);
        let estimate = columns * rows;
        if !estimate.is_finite() || estimate > self.max_pixels as f64 {
            return Err(self.quota_exceeded(if estimate.is_finite() { estimate as u64 } else { u64::MAX }));
        }

        let grid = GeoGrid::covering(&bbox, pixel_size, self.crs_epsg);
        let pixels = grid.pixel_count();
        if pixels > self.max_pixels {
            return Err(self.quota_exceeded(pixels));
        }

        debug!(
            "Export '{}': {}x{} pixels at {} m in EPSG:{}",
            self.description, grid.width, grid.height, self.scale, self.crs_epsg
        );
        Ok(grid)
    }

    fn quota_exceeded(&self, pixels: u64) -> PipelineError {
        PipelineError::ExportQuotaExceeded {
            description: self.description.clone(),
            pixels,
            max_pixels: self.max_pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::{MultiPolygon, Point, Polygon};

    fn region() -> Region {
        let ring = vec![
            Point::new(91.5, 26.6),
            Point::new(97.4, 26.6),
            Point::new(97.4, 29.5),
            Point::new(91.5, 29.5),
        ];
        Region::new("Arunachal Pradesh", MultiPolygon::new(vec![Polygon::new(ring, vec![])])).unwrap()
    }

    #[test]
    fn kilometre_export_in_degrees() {
        let grid = ExportParams::new("2020_dw_12_cropland_1km", 1000.0).plan_grid(&region()).unwrap();
        assert_eq!(grid.epsg, 4326);
        assert!((grid.pixel_width - 1000.0 / METRES_PER_DEGREE).abs() < 1e-15);
        assert!((grid.pixel_width - 0.008983).abs() < 1e-6);
        assert_eq!((grid.width, grid.height), (657, 323));
        assert!(grid.pixel_count() <= DEFAULT_MAX_PIXELS);
    }

    #[test]
    fn ceiling_is_enforced_at_planning() {
        let mut params = ExportParams::new("2020_dw_12_cropland_100m", 100.0);
        params.max_pixels = 1_000_000;
        match params.plan_grid(&region()) {
            Err(PipelineError::ExportQuotaExceeded { pixels, max_pixels, .. }) => {
                assert!(pixels > max_pixels);
                assert_eq!(max_pixels, 1_000_000);
            }
            other => panic!("expected quota error, got {:?}", other),
        }
    }

    #[test]
    fn microscopic_scale_is_over_quota_not_overflow() {
        let mut params = ExportParams::new("tiny", 1e-6);
        match params.plan_grid(&region()) {
            Err(PipelineError::ExportQuotaExceeded { pixels, max_pixels, .. }) => {
                assert!(pixels > max_pixels);
                assert_eq!(max_pixels, DEFAULT_MAX_PIXELS);
            }
            other => panic!("expected quota error, got {:?}", other),
        }

        params.max_pixels = u64::MAX;
        params.scale = 1e-12;
        assert!(matches!(
            params.plan_grid(&region()),
            Err(PipelineError::ExportQuotaExceeded { pixels: u64::MAX, .. })
        ));
    }

    #[test]
    fn projected_exports_use_metres() {
        let mut params = ExportParams::new("utm", 1000.0);
        params.crs_epsg = 32646;
        assert_eq!(params.pixel_size().unwrap(), 1000.0);
        let grid = params.plan_grid(&region()).unwrap();
        assert_eq!(grid.epsg, 32646);
        assert!(grid.width > 500 && grid.width < 700);
    }

    #[test]
    fn invalid_requests_are_rejected() {
        assert!(ExportParams::new("a/b", 100.0).validate().is_err());
        assert!(ExportParams::new("ok", 0.0).validate().is_err());
        let mut lzw = ExportParams::new("ok", 100.0);
        lzw.compression = "lzw".to_string();
        assert!(lzw.validate().is_err());
        let mut polar = ExportParams::new("ok", 100.0);
        polar.crs_epsg = 3031;
        assert!(matches!(polar.validate(), Err(PipelineError::UnsupportedCrs(_))));
    }
}
