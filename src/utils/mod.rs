//! Utility modules for common functionality

pub mod logger;
pub mod progress;
pub mod date_utils;
pub(crate) mod tiff_utils;
pub mod xml_utils;
pub(crate) mod write_utils;
pub(crate) mod tag_utils;
