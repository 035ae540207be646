//! Export submission
//!
//! A submitted export plans its grid on the caller's thread, so parameter
//! and pixel-ceiling errors surface immediately, then evaluates the
//! composite, clips, masks and writes on a worker thread.

mod geotiff;
mod params;
mod sink;
mod task;

pub use self::geotiff::{build_geotiff, write_geotiff};
pub use self::params::{ExportParams, DEFAULT_COMPRESSION, DEFAULT_CRS_EPSG, DEFAULT_MAX_PIXELS};
pub use self::sink::{DirectorySink, ExportSink};
pub use self::task::{ExportOutcome, TaskHandle, TaskManager, TaskState};

use log::info;
use std::sync::Arc;

use crate::boundary::Region;
use crate::classes::ClassTable;
use crate::composite::{clip, derive_mask, ClassStatistics, ModeComposite};
use crate::coordinate::GeoGrid;
use crate::errors::PipelineResult;
use crate::utils::progress::ProgressTracker;

/// Everything a worker needs to produce one export
pub struct ExportJob {
    pub composite: Arc<ModeComposite>,
    pub region: Region,
    pub target_class: u8,
    pub params: ExportParams,
    pub sink: Arc<dyn ExportSink>,
    pub classes: ClassTable,
    /// Also write `<description>_stats.json`
    pub write_stats: bool,
}

impl ExportJob {
    /// Evaluates and stores the export on `grid`
    pub fn run(&self, grid: &GeoGrid) -> PipelineResult<ExportOutcome> {
        let description = &self.params.description;
        let progress = ProgressTracker::new(grid.height as u64, description);

        let composite = self.composite.evaluate(grid, &progress)?;
        progress.finish();
        let clipped = clip(&composite, &self.region.geometry)?;
        let mask = derive_mask(&clipped, self.target_class)?;

        let (path, is_big_tiff) = self.sink.write_raster(description, &mask, &self.params.compression)?;

        let (stats, stats_path) = if self.write_stats {
            let stats = ClassStatistics::compute(
                &clipped,
                &self.region.name,
                self.params.scale,
                self.target_class,
                &self.classes,
            )?;
            let stats_path = self
                .sink
                .write_text(&format!("{}_stats.json", description), &stats.to_json()?)?;
            info!(
                "'{}': {} of {} valid pixels are {} ({:.2}%)",
                description,
                stats.target_pixels,
                stats.valid_pixels,
                stats.target_name,
                stats.target_fraction * 100.0
            );
            (Some(stats), Some(stats_path))
        } else {
            (None, None)
        };

        Ok(ExportOutcome {
            description: description.clone(),
            path,
            grid: *grid,
            is_big_tiff,
            stats,
            stats_path,
        })
    }
}

/// Plans the grid, then starts the job on the task manager
///
/// # Arguments
/// * `manager` - Task registry receiving the new task
/// * `job` - Export to run
///
/// # Returns
/// A handle to poll or wait on, or the planning error; nothing is started
/// when planning fails
pub fn submit_export(manager: &mut TaskManager, job: ExportJob) -> PipelineResult<TaskHandle> {
    let grid = job.params.plan_grid(&job.region)?;
    info!(
        "Submitting export '{}' to {} ({} pixels)",
        job.params.description,
        job.sink.location(),
        grid.pixel_count()
    );
    let description = job.params.description.clone();
    manager.submit(&description, move || job.run(&grid))
}
