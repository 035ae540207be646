//! Map views and PNG previews

mod map_view;

pub use self::map_view::{
    value_color, LayerData, LayerStyle, MapLayer, MapView, BOUNDARY_LAYER, COMPOSITE_LAYER, CROP_LAYER, DEFAULT_ZOOM,
};
