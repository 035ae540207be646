pub mod io;
pub mod tiff;
pub mod utils;
pub mod compression;
pub mod coordinate;
pub mod errors;
pub mod boundary;
pub mod collection;
pub mod classes;
pub mod composite;
pub mod export;
pub mod display;
pub mod config;
pub mod commands;
pub mod api;

pub use crate::api::{CropMask, PipelineOutput};
pub use crate::errors::{PipelineError, PipelineResult};

pub use tiff::{TiffBuilder, TiffReader};
pub use boundary::{BoundaryDataset, Region, RegionResolver};
pub use collection::{DateRange, ImageCollection};
pub use composite::{ModeComposite, Raster};
pub use config::PipelineConfig;
pub use coordinate::{BoundingBox, CoordinateSystem, CoordinateTransformer, GeoGrid, Point};
pub use display::MapView;
pub use export::{ExportParams, TaskHandle, TaskState};
