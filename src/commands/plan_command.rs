//! Dry run: resolve, filter and plan without reading pixels

use crate::api::CropMask;
use crate::commands::command_traits::Command;
use crate::config::PipelineConfig;
use crate::errors::{PipelineError, PipelineResult};

pub struct PlanCommand {
    config: PipelineConfig,
}

impl PlanCommand {
    pub fn new(config: PipelineConfig) -> Self {
        PlanCommand { config }
    }
}

impl Command for PlanCommand {
    fn execute(&self) -> PipelineResult<()> {
        let pipeline = CropMask::new(self.config.clone())?;
        let region = pipeline.resolve_region()?;
        let images = pipeline.select_images(&region)?;

        println!("Region: {}", region.name);
        println!(
            "  bbox: {:.5}, {:.5} .. {:.5}, {:.5}",
            region.bbox.min_x, region.bbox.min_y, region.bbox.max_x, region.bbox.max_y
        );
        println!("Images: {}", images.len());
        for image in images.iter() {
            println!("  {} {} ({}x{}, EPSG:{})", image.date, image.id, image.grid.width, image.grid.height, image.grid.epsg);
        }

        for (params, grid) in self.config.exports.iter().zip(pipeline.plan_exports(&region)?) {
            println!(
                "Export {}: {}x{} = {} pixels (max {}), EPSG:{}, {}",
                params.description,
                grid.width,
                grid.height,
                grid.pixel_count(),
                params.max_pixels,
                grid.epsg,
                params.compression
            );
        }

        if images.is_empty() {
            return Err(PipelineError::EmptyCollection(
                "no images match the date range and region".to_string(),
            ));
        }
        Ok(())
    }
}
