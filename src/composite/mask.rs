//! Binary masks and region clipping

use log::debug;

use super::raster::{Raster, RasterKind};
use crate::coordinate::{BoundingBox, CoordinateSystem, CoordinateSystemFactory, CoordinateTransformer, MultiPolygon};
use crate::errors::{PipelineError, PipelineResult};

/// Band name of the exported cropland mask
pub const CROP_BAND_NAME: &str = "crop_area";

/// Per-pixel equality test: 1 where the value equals `target`, else 0
///
/// Nodata stays nodata.
pub fn threshold_eq(raster: &Raster, target: u8) -> Raster {
    let values = raster
        .values
        .iter()
        .map(|&v| if v == raster.nodata { v } else { (v == target) as u8 })
        .collect();

    Raster {
        grid: raster.grid,
        band_name: raster.band_name.clone(),
        kind: RasterKind::Mask { target },
        values,
        nodata: raster.nodata,
    }
}

/// Derives the mask for `target` and names its band `crop_area`
///
/// A mask that was already derived for `target` is returned unchanged;
/// asking a mask for a different target is an error.
///
/// # Arguments
/// * `raster` - Class raster, or a mask from an earlier call
/// * `target` - Class code that becomes 1
///
/// # Returns
/// A 0/1 mask with nodata preserved
pub fn derive_mask(raster: &Raster, target: u8) -> PipelineResult<Raster> {
    match raster.kind {
        RasterKind::Classes => Ok(threshold_eq(raster, target).renamed(CROP_BAND_NAME)),
        RasterKind::Mask { target: existing } if existing == target => Ok(raster.clone()),
        RasterKind::Mask { target: existing } => Err(PipelineError::InvalidParameter(format!(
            "Raster is already a mask for class {}, not {}",
            existing, target
        ))),
    }
}

/// Sets every pixel whose centre falls outside `region` to nodata
///
/// `region` is in EPSG:4326; pixel centres are projected to it first.
///
/// # Arguments
/// * `raster` - Raster to clip, in any supported CRS
/// * `region` - Region geometry
///
/// # Returns
/// A copy of `raster` with the outside pixels set to nodata, or an error if
/// the raster's CRS is not supported
pub fn clip(raster: &Raster, region: &MultiPolygon) -> PipelineResult<Raster> {
    let grid_crs = CoordinateSystemFactory::from_epsg(raster.grid.epsg)?;
    let bbox = region.bbox().unwrap_or(BoundingBox::new(0.0, 0.0, -1.0, -1.0));
    let transformer = CoordinateTransformer;

    let mut clipped = raster.clone();
    let mut outside = 0usize;
    for row in 0..raster.grid.height {
        for col in 0..raster.grid.width {
            let index = row * raster.grid.width + col;
            if clipped.values[index] == clipped.nodata {
                continue;
            }
            let center = transformer.transform_point(
                &raster.grid.pixel_center(col, row),
                &grid_crs,
                &CoordinateSystem::WGS84,
            );
            if !(bbox.contains(&center) && region.contains(&center)) {
                clipped.values[index] = clipped.nodata;
                outside += 1;
            }
        }
    }

    debug!("Clip masked {} pixels outside the region", outside);
    Ok(clipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::raster::NODATA;
    use crate::coordinate::{GeoGrid, Point, Polygon};

    fn classes() -> Raster {
        let grid = GeoGrid {
            epsg: 4326,
            origin_x: 0.0,
            origin_y: 2.0,
            pixel_width: 1.0,
            pixel_height: 1.0,
            width: 3,
            height: 2,
        };
        Raster::new(grid, "label_mode", RasterKind::Classes, vec![4, 1, NODATA, 4, 4, 0]).unwrap()
    }

    #[test]
    fn mask_marks_the_target_class() {
        let mask = derive_mask(&classes(), 4).unwrap();
        assert_eq!(mask.values, vec![1, 0, NODATA, 1, 1, 0]);
        assert_eq!(mask.band_name, CROP_BAND_NAME);
        assert_eq!(mask.kind, RasterKind::Mask { target: 4 });
    }

    #[test]
    fn rethresholding_a_mask_is_idempotent() {
        let mask = derive_mask(&classes(), 4).unwrap();
        assert_eq!(derive_mask(&mask, 4).unwrap(), mask);
        assert_eq!(threshold_eq(&mask, 1).values, mask.values);
        assert!(derive_mask(&mask, 6).is_err());
    }

    #[test]
    fn clip_masks_centres_outside_the_region() {
        // Triangle covering the centres (0.5, 1.5), (0.5, 0.5) and (1.5, 0.5)
        let triangle = MultiPolygon::new(vec![Polygon::new(
            vec![Point::new(0.0, 0.0), Point::new(2.2, 0.0), Point::new(0.0, 2.2)],
            vec![],
        )]);
        let clipped = clip(&classes(), &triangle).unwrap();
        assert_eq!(clipped.values, vec![4, NODATA, NODATA, 4, 4, NODATA]);
    }
}
