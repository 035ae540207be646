//! Coordinate handling for geospatial data
//!
//! Points, boxes, polygons and pixel grids, plus reprojection between the
//! WGS 84 based systems that label rasters and exports use.

mod bbox;
mod point;
mod polygon;
mod grid;
mod transform;
mod crs;

pub use self::bbox::BoundingBox;
pub use self::point::Point;
pub use self::polygon::{MultiPolygon, Polygon};
pub use self::grid::{GeoGrid, METRES_PER_DEGREE};
pub use self::transform::CoordinateTransformer;
pub use self::crs::{CoordinateSystem, CoordinateSystemFactory};
