//! Pixel counts per land-cover class inside a region

use serde::Serialize;
use std::collections::BTreeMap;

use super::raster::{Raster, RasterKind};
use crate::classes::ClassTable;
use crate::errors::{PipelineError, PipelineResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassCount {
    pub code: u8,
    pub name: String,
    pub pixels: u64,
    pub area_km2: f64,
}

/// Class distribution of a clipped composite
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStatistics {
    pub region: String,
    pub scale: f64,
    pub crs: String,
    pub width: usize,
    pub height: usize,
    pub valid_pixels: u64,
    pub target_class: u8,
    pub target_name: String,
    pub target_pixels: u64,
    /// Target pixels over valid pixels, 0 when nothing is valid
    pub target_fraction: f64,
    pub target_area_km2: f64,
    pub classes: Vec<ClassCount>,
}

impl ClassStatistics {
    /// Counts the classes of `composite`, which must hold class codes
    ///
    /// # Arguments
    /// * `composite` - Clipped class raster
    /// * `region` - Region name recorded in the output
    /// * `scale` - Export scale in metres, recorded in the output
    /// * `target` - Class whose share is reported
    /// * `table` - Class names
    ///
    /// # Returns
    /// Per-class pixel counts and areas, or an error when given a mask
    pub fn compute(
        composite: &Raster,
        region: &str,
        scale: f64,
        target: u8,
        table: &ClassTable,
    ) -> PipelineResult<Self> {
        if composite.kind != RasterKind::Classes {
            return Err(PipelineError::InvalidParameter(
                "Class statistics need a class raster, not a mask".to_string(),
            ));
        }

        let grid = &composite.grid;
        let mut totals: BTreeMap<u8, (u64, f64)> = BTreeMap::new();
        for row in 0..grid.height {
            let pixel_km2 = grid.pixel_area_m2(row) / 1.0e6;
            for col in 0..grid.width {
                if let Some(code) = composite.get(col, row) {
                    let entry = totals.entry(code).or_insert((0, 0.0));
                    entry.0 += 1;
                    entry.1 += pixel_km2;
                }
            }
        }

        let valid_pixels: u64 = totals.values().map(|t| t.0).sum();
        let (target_pixels, target_area_km2) = totals.get(&target).copied().unwrap_or((0, 0.0));
        let target_fraction = if valid_pixels == 0 {
            0.0
        } else {
            target_pixels as f64 / valid_pixels as f64
        };

        let classes = totals
            .into_iter()
            .map(|(code, (pixels, area_km2))| ClassCount { code, name: table.name_of(code), pixels, area_km2 })
            .collect();

        Ok(ClassStatistics {
            region: region.to_string(),
            scale,
            crs: format!("EPSG:{}", grid.epsg),
            width: grid.width,
            height: grid.height,
            valid_pixels,
            target_class: target,
            target_name: table.name_of(target),
            target_pixels,
            target_fraction,
            target_area_km2,
            classes,
        })
    }

    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
