//! Full pipeline run
//!
//! Submits the exports, then waits for them: the local export backend
//! lives in this process, so returning early would abandon the tasks.

use log::{error, info};

use crate::api::CropMask;
use crate::commands::command_traits::Command;
use crate::config::PipelineConfig;
use crate::errors::{PipelineError, PipelineResult};

pub struct RunCommand {
    config: PipelineConfig,
}

impl RunCommand {
    pub fn new(config: PipelineConfig) -> Self {
        RunCommand { config }
    }
}

impl Command for RunCommand {
    fn execute(&self) -> PipelineResult<()> {
        let pipeline = CropMask::new(self.config.clone())?;
        let output = pipeline.run()?;

        info!(
            "Region '{}': {} images composited, {} export task(s) submitted",
            output.region.name,
            output.image_count,
            output.handles().len()
        );

        let mut failures = 0;
        for handle in output.handles() {
            match handle.wait() {
                Ok(outcome) => {
                    println!(
                        "{}: {} ({}x{}, EPSG:{}{})",
                        outcome.description,
                        outcome.path.display(),
                        outcome.grid.width,
                        outcome.grid.height,
                        outcome.grid.epsg,
                        if outcome.is_big_tiff { ", BigTIFF" } else { "" }
                    );
                    if let Some(stats) = &outcome.stats {
                        println!(
                            "  {}: {} of {} pixels ({:.2}%, ~{:.1} km²)",
                            stats.target_name,
                            stats.target_pixels,
                            stats.valid_pixels,
                            stats.target_fraction * 100.0,
                            stats.target_area_km2
                        );
                    }
                }
                Err(e) => {
                    error!("{}", e);
                    failures += 1;
                }
            }
        }

        if failures > 0 {
            return Err(PipelineError::Export(format!("{} export task(s) failed", failures)));
        }
        Ok(())
    }
}
