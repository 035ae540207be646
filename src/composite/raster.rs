//! In-memory 8-bit rasters produced by the pipeline

use crate::coordinate::GeoGrid;
use crate::errors::{PipelineError, PipelineResult};

/// Value of pixels without a valid observation
pub const NODATA: u8 = 255;

/// What the values of a raster mean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterKind {
    /// Land-cover class codes
    Classes,
    /// 1 where the source equalled `target`, else 0
    Mask { target: u8 },
}

/// A single-band raster on a grid, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub grid: GeoGrid,
    pub band_name: String,
    pub kind: RasterKind,
    pub values: Vec<u8>,
    pub nodata: u8,
}

impl Raster {
    pub fn new(grid: GeoGrid, band_name: &str, kind: RasterKind, values: Vec<u8>) -> PipelineResult<Self> {
        if values.len() as u64 != grid.pixel_count() {
            return Err(PipelineError::InvalidParameter(format!(
                "{} values for a {}x{} grid",
                values.len(),
                grid.width,
                grid.height
            )));
        }
        Ok(Raster { grid, band_name: band_name.to_string(), kind, values, nodata: NODATA })
    }

    /// Value at a pixel, None outside the grid or at nodata
    pub fn get(&self, col: usize, row: usize) -> Option<u8> {
        if col >= self.grid.width || row >= self.grid.height {
            return None;
        }
        let value = self.values[row * self.grid.width + col];
        if value == self.nodata {
            None
        } else {
            Some(value)
        }
    }

    /// Same pixels under another band name
    pub fn renamed(mut self, band_name: &str) -> Self {
        self.band_name = band_name.to_string();
        self
    }

    pub fn valid_count(&self) -> u64 {
        self.values.iter().filter(|&&v| v != self.nodata).count() as u64
    }

    /// Smallest and largest valid value
    pub fn value_range(&self) -> Option<(u8, u8)> {
        self.values
            .iter()
            .filter(|&&v| v != self.nodata)
            .fold(None, |range, &v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GeoGrid {
        GeoGrid {
            epsg: 4326,
            origin_x: 0.0,
            origin_y: 2.0,
            pixel_width: 1.0,
            pixel_height: 1.0,
            width: 3,
            height: 2,
        }
    }

    #[test]
    fn value_count_must_match_the_grid() {
        assert!(Raster::new(grid(), "b", RasterKind::Classes, vec![0; 5]).is_err());
    }

    #[test]
    fn nodata_is_not_a_value() {
        let r = Raster::new(grid(), "b", RasterKind::Classes, vec![3, NODATA, 7, 0, 0, NODATA]).unwrap();
        assert_eq!(r.get(0, 0), Some(3));
        assert_eq!(r.get(1, 0), None);
        assert_eq!(r.get(3, 0), None);
        assert_eq!(r.valid_count(), 4);
        assert_eq!(r.value_range(), Some((0, 7)));
    }
}
