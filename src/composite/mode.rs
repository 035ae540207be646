//! Per-pixel majority vote over a label image stack
//!
//! The composite is a recipe over the loaded bands. It is evaluated on
//! whatever grid is asked for: every output pixel centre is mapped into
//! each image's CRS and the containing source pixel votes (nearest
//! neighbour). Among equally frequent labels the smallest code wins.

use log::{debug, info};

use super::raster::{Raster, RasterKind, NODATA};
use crate::collection::{ImageCollection, LabelBand};
use crate::coordinate::{CoordinateSystem, CoordinateSystemFactory, CoordinateTransformer, GeoGrid, Point};
use crate::errors::{PipelineError, PipelineResult};
use crate::utils::progress::ProgressTracker;

/// Band name of an evaluated composite
pub const MODE_BAND_NAME: &str = "label_mode";

/// Label counts for one pixel
///
/// Labels are restricted to 0..=254 so the winner fits an 8-bit raster
/// with 255 left for nodata.
pub struct Votes {
    counts: [u32; NODATA as usize],
    touched: Vec<u8>,
}

impl Votes {
    pub fn new() -> Self {
        Votes { counts: [0; NODATA as usize], touched: Vec::new() }
    }

    /// Counts one observation; labels outside 0..=254 are ignored
    pub fn add(&mut self, label: u16) {
        if label >= NODATA as u16 {
            return;
        }
        let count = &mut self.counts[label as usize];
        if *count == 0 {
            self.touched.push(label as u8);
        }
        *count = count.saturating_add(1);
    }

    /// Most frequent label, smallest code on ties
    pub fn winner(&self) -> Option<u8> {
        self.touched.iter().copied().max_by(|&a, &b| {
            self.counts[a as usize]
                .cmp(&self.counts[b as usize])
                .then(b.cmp(&a))
        })
    }

    pub fn clear(&mut self) {
        for &label in &self.touched {
            self.counts[label as usize] = 0;
        }
        self.touched.clear();
    }
}

impl Default for Votes {
    fn default() -> Self {
        Self::new()
    }
}

/// Mode composite of a filtered collection
pub struct ModeComposite {
    bands: Vec<LabelBand>,
    /// Distinct source CRSs, so each pixel centre is projected once per CRS
    systems: Vec<CoordinateSystem>,
    band_system: Vec<usize>,
}

impl ModeComposite {
    /// Loads every band of the collection
    ///
    /// An empty collection is an error; there is nothing to vote on.
    ///
    /// # Arguments
    /// * `collection` - Filtered label images
    ///
    /// # Returns
    /// The composite, `EmptyCollection`, or the first band that fails to decode
    pub fn from_collection(collection: &ImageCollection) -> PipelineResult<Self> {
        if collection.is_empty() {
            return Err(PipelineError::EmptyCollection(
                "no images match the date range and region".to_string(),
            ));
        }

        info!("Loading {} label images for the mode composite", collection.len());
        let progress = ProgressTracker::new(collection.len() as u64, "Loading label images");
        let mut bands = Vec::with_capacity(collection.len());
        for image in collection.iter() {
            bands.push(image.load_band()?);
            progress.increment(1);
        }
        progress.finish();

        Self::from_bands(bands)
    }

    pub fn from_bands(bands: Vec<LabelBand>) -> PipelineResult<Self> {
        if bands.is_empty() {
            return Err(PipelineError::EmptyCollection("no label bands to composite".to_string()));
        }

        let mut systems: Vec<CoordinateSystem> = Vec::new();
        let band_system = bands
            .iter()
            .map(|band| match systems.iter().position(|s| *s == band.crs) {
                Some(i) => i,
                None => {
                    systems.push(band.crs);
                    systems.len() - 1
                }
            })
            .collect();

        Ok(ModeComposite { bands, systems, band_system })
    }

    pub fn image_count(&self) -> usize {
        self.bands.len()
    }

    /// Evaluates the composite on `grid`
    ///
    /// # Arguments
    /// * `grid` - Output grid; its pixel centres are sampled in every image
    /// * `progress` - Advanced once per finished row
    ///
    /// # Returns
    /// A class raster with the most frequent label per pixel and nodata where
    /// no image has an observation
    pub fn evaluate(&self, grid: &GeoGrid, progress: &ProgressTracker) -> PipelineResult<Raster> {
        let grid_crs = CoordinateSystemFactory::from_epsg(grid.epsg)?;
        let transformer = CoordinateTransformer;
        debug!(
            "Evaluating mode of {} images on a {}x{} grid (EPSG:{})",
            self.bands.len(),
            grid.width,
            grid.height,
            grid.epsg
        );

        let mut values = Vec::with_capacity(grid.pixel_count() as usize);
        let mut projected = vec![Point::new(0.0, 0.0); self.systems.len()];
        let mut votes = Votes::new();

        for row in 0..grid.height {
            for col in 0..grid.width {
                let center = grid.pixel_center(col, row);
                for (slot, system) in projected.iter_mut().zip(&self.systems) {
                    *slot = transformer.transform_point(&center, &grid_crs, system);
                }

                for (band, &system) in self.bands.iter().zip(&self.band_system) {
                    if let Some(label) = band.sample(&projected[system]) {
                        votes.add(label);
                    }
                }

                values.push(votes.winner().unwrap_or(NODATA));
                votes.clear();
            }
            progress.increment(1);
        }

        Raster::new(*grid, MODE_BAND_NAME, RasterKind::Classes, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::BandData;

    fn band(values: Vec<u16>, nodata: Option<u16>) -> LabelBand {
        LabelBand {
            grid: GeoGrid {
                epsg: 4326,
                origin_x: 0.0,
                origin_y: 2.0,
                pixel_width: 1.0,
                pixel_height: 1.0,
                width: 2,
                height: 2,
            },
            crs: CoordinateSystem::WGS84,
            nodata,
            band: BandData { width: 2, height: 2, values },
        }
    }

    #[test]
    fn ties_go_to_the_smallest_code() {
        let mut votes = Votes::new();
        for label in [6, 4, 6, 4, 2] {
            votes.add(label);
        }
        assert_eq!(votes.winner(), Some(4));
        votes.add(6);
        assert_eq!(votes.winner(), Some(6));
        votes.clear();
        assert_eq!(votes.winner(), None);
    }

    #[test]
    fn unrepresentable_labels_do_not_vote() {
        let mut votes = Votes::new();
        votes.add(255);
        votes.add(1000);
        assert_eq!(votes.winner(), None);
    }

    #[test]
    fn deep_stacks_keep_exact_counts() {
        let mut votes = Votes::new();
        for _ in 0..66_000 {
            votes.add(2);
        }
        for _ in 0..70_000 {
            votes.add(6);
        }
        assert_eq!(votes.winner(), Some(6));
    }

    #[test]
    fn majority_per_pixel() {
        let composite = ModeComposite::from_bands(vec![
            band(vec![4, 1, 0, 9], None),
            band(vec![4, 2, 0, 9], Some(9)),
            band(vec![1, 2, 0, 9], Some(9)),
        ])
        .unwrap();

        // One column wider than the sources; that column has no observations
        let grid = GeoGrid {
            epsg: 4326,
            origin_x: 0.0,
            origin_y: 2.0,
            pixel_width: 1.0,
            pixel_height: 1.0,
            width: 3,
            height: 2,
        };
        let raster = composite.evaluate(&grid, &ProgressTracker::hidden(2)).unwrap();
        assert_eq!(raster.values, vec![4, 2, NODATA, 0, 9, NODATA]);
        assert_eq!(raster.kind, RasterKind::Classes);
    }

    #[test]
    fn nothing_to_composite() {
        assert!(matches!(ModeComposite::from_bands(vec![]), Err(PipelineError::EmptyCollection(_))));
        assert!(matches!(
            ModeComposite::from_collection(&ImageCollection::default()),
            Err(PipelineError::EmptyCollection(_))
        ));
    }
}
