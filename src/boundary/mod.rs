//! Administrative boundaries and region lookup

mod geojson;
mod region;

pub use self::geojson::{BoundaryDataset, BoundaryFeature, RawGeometry};
pub use self::region::{Region, RegionResolver, DEFAULT_NAME_ATTRIBUTE};
