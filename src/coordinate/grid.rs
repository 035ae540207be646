//! Raster grids: a north-up affine placement plus pixel dimensions

use super::bbox::BoundingBox;
use super::point::Point;
use crate::tiff::geo_keys::{GeoReference, EPSG_WGS84};

/// Length of one degree of longitude at the equator, in metres
pub const METRES_PER_DEGREE: f64 = 111_319.490_793_273_57;

/// A north-up pixel grid in some CRS
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoGrid {
    pub epsg: u32,
    /// Top-left corner of the top-left pixel
    pub origin_x: f64,
    pub origin_y: f64,
    /// Pixel size in map units, both positive
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub width: usize,
    pub height: usize,
}

impl GeoGrid {
    /// Grid of a raster read from a GeoTIFF
    pub fn from_georeference(georef: &GeoReference, width: usize, height: usize) -> Self {
        GeoGrid {
            epsg: georef.epsg,
            origin_x: georef.origin_x,
            origin_y: georef.origin_y,
            pixel_width: georef.pixel_width,
            pixel_height: georef.pixel_height,
            width,
            height,
        }
    }

    /// Grid of square pixels covering `bbox`, anchored at its top-left corner
    ///
    /// The last row and column may overhang the box by less than one pixel.
    pub fn covering(bbox: &BoundingBox, pixel_size: f64, epsg: u32) -> Self {
        let width = (bbox.width() / pixel_size).ceil().max(1.0) as usize;
        let height = (bbox.height() / pixel_size).ceil().max(1.0) as usize;

        GeoGrid {
            epsg,
            origin_x: bbox.min_x,
            origin_y: bbox.max_y,
            pixel_width: pixel_size,
            pixel_height: pixel_size,
            width,
            height,
        }
    }

    pub fn to_georeference(&self) -> GeoReference {
        GeoReference {
            epsg: self.epsg,
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            pixel_width: self.pixel_width,
            pixel_height: self.pixel_height,
        }
    }

    /// Saturates at `u64::MAX`
    pub fn pixel_count(&self) -> u64 {
        (self.width as u64).saturating_mul(self.height as u64)
    }

    /// Map coordinates of a pixel's centre
    pub fn pixel_center(&self, col: usize, row: usize) -> Point {
        Point::new(
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Pixel containing a map coordinate, or None outside the grid
    pub fn to_pixel(&self, point: &Point) -> Option<(usize, usize)> {
        let col = ((point.x - self.origin_x) / self.pixel_width).floor();
        let row = ((self.origin_y - point.y) / self.pixel_height).floor();

        if col < 0.0 || row < 0.0 || col >= self.width as f64 || row >= self.height as f64 {
            return None;
        }
        Some((col as usize, row as usize))
    }

    /// Approximate ground area of one pixel in `row`, in square metres
    ///
    /// Geographic grids shrink with the cosine of the row's latitude.
    pub fn pixel_area_m2(&self, row: usize) -> f64 {
        if self.epsg == EPSG_WGS84 {
            let lat = self.pixel_center(0, row).y.to_radians();
            self.pixel_width * METRES_PER_DEGREE * lat.cos() * self.pixel_height * METRES_PER_DEGREE
        } else {
            self.pixel_width * self.pixel_height
        }
    }

    /// Map extent of the grid
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(
            self.origin_x,
            self.origin_y - self.height as f64 * self.pixel_height,
            self.origin_x + self.width as f64 * self.pixel_width,
            self.origin_y,
        )
    }
}
