//! Library entry point for the cropland pipeline
//!
//! `CropMask` runs the steps in order: region lookup, temporal and spatial
//! filtering, the mode composite, map assembly and export submission.

use log::info;
use std::sync::Arc;

use crate::boundary::{BoundaryDataset, Region, RegionResolver};
use crate::classes::{dynamic_world, ClassTable};
use crate::collection::ImageCollection;
use crate::composite::{clip, derive_mask, ModeComposite};
use crate::config::PipelineConfig;
use crate::coordinate::GeoGrid;
use crate::display::{LayerData, LayerStyle, MapLayer, MapView, BOUNDARY_LAYER, COMPOSITE_LAYER, CROP_LAYER};
use crate::errors::PipelineResult;
use crate::export::{submit_export, DirectorySink, ExportJob, ExportOutcome, ExportSink, TaskHandle, TaskManager};
use crate::tiff::EPSG_WGS84;
use crate::utils::progress::ProgressTracker;

/// Result of a run: everything the caller may inspect or wait on
pub struct PipelineOutput {
    pub region: Region,
    /// Images left after the date and bounds filters
    pub image_count: usize,
    pub map_view: MapView,
    pub tasks: TaskManager,
}

impl PipelineOutput {
    pub fn handles(&self) -> &[TaskHandle] {
        self.tasks.tasks()
    }

    /// Waits for every export; the first failure is returned
    pub fn wait(&self) -> PipelineResult<Vec<ExportOutcome>> {
        self.tasks.wait_all().into_iter().collect()
    }
}

/// Main interface to the cropland pipeline
pub struct CropMask {
    config: PipelineConfig,
    classes: ClassTable,
}

impl CropMask {
    /// Creates a pipeline for a configuration
    ///
    /// # Arguments
    /// * `config` - Region, dates, target class and exports to run
    ///
    /// # Returns
    /// The pipeline, or a configuration error if `config` does not validate
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(CropMask { config, classes: dynamic_world().clone() })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Looks up the configured region in the boundary file
    ///
    /// # Returns
    /// The single matching region, `RegionNotFound` when no feature matches, or
    /// `AmbiguousRegion` when several do
    pub fn resolve_region(&self) -> PipelineResult<Region> {
        let dataset = BoundaryDataset::load(&self.config.boundaries)?;
        RegionResolver::new(&self.config.name_attribute).resolve(&dataset, &self.config.region)
    }

    /// Images in the date range whose footprint meets the region
    ///
    /// # Arguments
    /// * `region` - Region whose bounding box the footprints must intersect
    ///
    /// # Returns
    /// The filtered collection, possibly empty
    pub fn select_images(&self, region: &Region) -> PipelineResult<ImageCollection> {
        let range = self.config.date_range()?;
        let selected = ImageCollection::from_directory(&self.config.collection)?
            .filter_date(&range)
            .filter_bounds(&region.bbox);
        info!(
            "{} images between {} and {} intersect '{}'",
            selected.len(),
            range.start,
            range.end,
            region.name
        );
        Ok(selected)
    }

    /// Output grids of every export, checked against their ceilings
    ///
    /// # Arguments
    /// * `region` - Region the grids must cover
    ///
    /// # Returns
    /// One grid per configured export, in order, or the first planning error
    pub fn plan_exports(&self, region: &Region) -> PipelineResult<Vec<GeoGrid>> {
        self.config.exports.iter().map(|export| export.plan_grid(region)).collect()
    }

    /// Runs with exports going to the configured output directory
    pub fn run(&self) -> PipelineResult<PipelineOutput> {
        let sink: Arc<dyn ExportSink> = Arc::new(DirectorySink::new(&self.config.output_dir)?);
        self.run_with_sink(sink)
    }

    /// Runs with exports going to `sink`
    ///
    /// Returns once the exports are submitted; wait on the output's
    /// handles for them to finish.
    ///
    /// # Arguments
    /// * `sink` - Destination for the GeoTIFFs and statistics files
    ///
    /// # Returns
    /// The resolved region, the map view and the export handles, or the first
    /// error raised before submission (region lookup, empty collection, pixel
    /// ceiling, preview)
    pub fn run_with_sink(&self, sink: Arc<dyn ExportSink>) -> PipelineResult<PipelineOutput> {
        let region = self.resolve_region()?;
        let images = self.select_images(&region)?;
        let composite = Arc::new(ModeComposite::from_collection(&images)?);

        // Every ceiling is checked before the first task starts
        self.plan_exports(&region)?;

        let map_view = self.build_map_view(&region, &composite)?;
        if let Some(path) = &self.config.preview {
            map_view.render_png(path, self.config.preview_width)?;
        }

        let mut tasks = TaskManager::new();
        for params in &self.config.exports {
            let job = ExportJob {
                composite: Arc::clone(&composite),
                region: region.clone(),
                target_class: self.config.target_class,
                params: params.clone(),
                sink: Arc::clone(&sink),
                classes: self.classes.clone(),
                write_stats: self.config.write_stats,
            };
            submit_export(&mut tasks, job)?;
        }

        Ok(PipelineOutput { region, image_count: images.len(), map_view, tasks })
    }

    /// Map centred on the region with the crop mask evaluated at preview size
    fn build_map_view(&self, region: &Region, composite: &ModeComposite) -> PipelineResult<MapView> {
        let width = self.config.preview_width.max(1) as f64;
        let grid = GeoGrid::covering(&region.bbox, region.bbox.width().max(f64::EPSILON) / width, EPSG_WGS84);
        let progress = ProgressTracker::hidden(grid.height as u64);
        let classes = clip(&composite.evaluate(&grid, &progress)?, &region.geometry)?;
        let mask = derive_mask(&classes, self.config.target_class)?;

        let (min, max) = self.classes.code_range().unwrap_or((0, 8));
        let composite_layer = MapLayer::new(
            COMPOSITE_LAYER,
            LayerData::Raster(classes),
            LayerStyle::palette(min as f64, max as f64, self.classes.palette()),
        );

        let mut view = MapView::centered_on(region);
        view.add_layer(if self.config.show_composite { composite_layer } else { composite_layer.hidden() });
        view.add_layer(MapLayer::new(CROP_LAYER, LayerData::Raster(mask), LayerStyle::default()));
        view.add_layer(MapLayer::new(
            BOUNDARY_LAYER,
            LayerData::Vector(region.geometry.clone()),
            LayerStyle::outline(),
        ));
        Ok(view)
    }
}
