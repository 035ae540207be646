//! Composites, masks and class statistics

pub mod mask;
pub mod mode;
pub mod raster;
pub mod stats;

pub use self::mask::{clip, derive_mask, threshold_eq, CROP_BAND_NAME};
pub use self::mode::{ModeComposite, Votes, MODE_BAND_NAME};
pub use self::raster::{Raster, RasterKind, NODATA};
pub use self::stats::{ClassCount, ClassStatistics};
