//! Map views of a pipeline run
//!
//! A `MapView` is a centre, a zoom level and an ordered stack of styled
//! layers. It is plain data; `render` rasterises it for a quick preview.

use image::{ImageFormat, Rgba, RgbaImage};
use log::{debug, info};
use std::path::Path;

use crate::boundary::Region;
use crate::classes::{parse_hex_alpha, parse_hex_color};
use crate::composite::Raster;
use crate::coordinate::{BoundingBox, CoordinateSystem, CoordinateSystemFactory, CoordinateTransformer, MultiPolygon, Point};
use crate::errors::{PipelineError, PipelineResult};

/// Zoom level used when centring on a region
pub const DEFAULT_ZOOM: u8 = 10;

/// Layer names
pub const BOUNDARY_LAYER: &str = "Boundary";
pub const CROP_LAYER: &str = "Crop Areas";
pub const COMPOSITE_LAYER: &str = "Classified Composite";

/// Visualisation parameters of a layer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerStyle {
    /// Outline colour, `RRGGBB`
    pub color: Option<String>,
    /// Fill colour, `RRGGBB` or `RRGGBBAA`
    pub fill_color: Option<String>,
    /// Colours spread evenly over `min..=max`; grayscale when empty
    pub palette: Vec<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl LayerStyle {
    /// Red outline without fill
    pub fn outline() -> Self {
        LayerStyle {
            color: Some("FF0000".to_string()),
            fill_color: Some("00000000".to_string()),
            ..Default::default()
        }
    }

    /// Palette stretched over a value range
    pub fn palette(min: f64, max: f64, palette: Vec<String>) -> Self {
        LayerStyle { min: Some(min), max: Some(max), palette, ..Default::default() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerData {
    /// Region geometry in EPSG:4326
    Vector(MultiPolygon),
    Raster(Raster),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapLayer {
    pub name: String,
    pub data: LayerData,
    pub style: LayerStyle,
    pub visible: bool,
}

impl MapLayer {
    pub fn new(name: &str, data: LayerData, style: LayerStyle) -> Self {
        MapLayer { name: name.to_string(), data, style, visible: true }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Extent in EPSG:4326
    fn extent(&self) -> PipelineResult<Option<BoundingBox>> {
        match &self.data {
            LayerData::Vector(shape) => Ok(shape.bbox()),
            LayerData::Raster(raster) => {
                let crs = CoordinateSystemFactory::from_epsg(raster.grid.epsg)?;
                let bbox = CoordinateTransformer.transform_bbox(&raster.grid.bbox(), &crs, &CoordinateSystem::WGS84)?;
                Ok(Some(bbox))
            }
        }
    }
}

/// The map state a run hands back to its caller
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: Point,
    pub zoom: u8,
    pub layers: Vec<MapLayer>,
}

impl MapView {
    pub fn new(center: Point, zoom: u8) -> Self {
        MapView { center, zoom, layers: Vec::new() }
    }

    /// Centred on the region's centroid at the default zoom
    pub fn centered_on(region: &Region) -> Self {
        Self::new(region.centroid(), DEFAULT_ZOOM)
    }

    /// Adds a layer on top of the existing ones
    pub fn add_layer(&mut self, layer: MapLayer) {
        debug!("Map layer '{}' added", layer.name);
        self.layers.push(layer);
    }

    pub fn layer(&self, name: &str) -> Option<&MapLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Union of the visible layers' extents in EPSG:4326
    pub fn extent(&self) -> PipelineResult<Option<BoundingBox>> {
        let mut extent: Option<BoundingBox> = None;
        for layer in self.layers.iter().filter(|l| l.visible) {
            if let Some(bbox) = layer.extent()? {
                extent = Some(match extent {
                    Some(e) => e.union(&bbox),
                    None => bbox,
                });
            }
        }
        Ok(extent)
    }

    /// Rasterises the visible layers, bottom first, `width` pixels wide
    ///
    /// # Arguments
    /// * `width` - Image width; the height follows the extent's aspect ratio
    ///
    /// # Returns
    /// The RGBA image, or an error if no visible layer has an extent
    pub fn render(&self, width: u32) -> PipelineResult<RgbaImage> {
        let extent = self
            .extent()?
            .ok_or_else(|| PipelineError::InvalidParameter("Map view has no visible layers".to_string()))?;
        if width == 0 || extent.width() <= 0.0 || extent.height() <= 0.0 {
            return Err(PipelineError::InvalidParameter("Map view has an empty extent".to_string()));
        }

        let height = ((width as f64 * extent.height() / extent.width()).round() as u32).max(1);
        let frame = Frame { extent, width, height };
        let mut canvas = RgbaImage::new(width, height);

        for layer in self.layers.iter().filter(|l| l.visible) {
            match &layer.data {
                LayerData::Raster(raster) => draw_raster(&mut canvas, &frame, raster, &layer.style)?,
                LayerData::Vector(shape) => draw_vector(&mut canvas, &frame, shape, &layer.style)?,
            }
        }
        Ok(canvas)
    }

    /// Renders to a PNG file
    ///
    /// # Arguments
    /// * `path` - Output file
    /// * `width` - Image width in pixels
    pub fn render_png(&self, path: &Path, width: u32) -> PipelineResult<()> {
        let canvas = self.render(width)?;
        canvas
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| PipelineError::Export(format!("Failed to save preview {}: {}", path.display(), e)))?;
        info!("Map preview written to {} ({}x{})", path.display(), canvas.width(), canvas.height());
        Ok(())
    }
}

/// Maps canvas pixels to EPSG:4326
struct Frame {
    extent: BoundingBox,
    width: u32,
    height: u32,
}

impl Frame {
    fn pixel_center(&self, x: u32, y: u32) -> Point {
        Point::new(
            self.extent.min_x + (x as f64 + 0.5) * self.extent.width() / self.width as f64,
            self.extent.max_y - (y as f64 + 0.5) * self.extent.height() / self.height as f64,
        )
    }

    fn to_canvas(&self, point: &Point) -> (f64, f64) {
        (
            (point.x - self.extent.min_x) / self.extent.width() * self.width as f64,
            (self.extent.max_y - point.y) / self.extent.height() * self.height as f64,
        )
    }
}

/// Alpha-composites `color` over the canvas pixel
fn blend(canvas: &mut RgbaImage, x: u32, y: u32, color: [u8; 4]) {
    let dst = canvas.get_pixel(x, y).0;
    let a = color[3] as f64 / 255.0;
    let out_a = a + dst[3] as f64 / 255.0 * (1.0 - a);
    if out_a <= 0.0 {
        return;
    }
    let mix = |s: u8, d: u8| {
        ((s as f64 * a + d as f64 * dst[3] as f64 / 255.0 * (1.0 - a)) / out_a).round() as u8
    };
    canvas.put_pixel(
        x,
        y,
        Rgba([mix(color[0], dst[0]), mix(color[1], dst[1]), mix(color[2], dst[2]), (out_a * 255.0).round() as u8]),
    );
}

/// Colour of a raster value under a style
pub fn value_color(value: u8, style: &LayerStyle) -> PipelineResult<[u8; 4]> {
    let min = style.min.unwrap_or(0.0);
    let max = style.max.unwrap_or(if style.palette.is_empty() { 1.0 } else { style.palette.len() as f64 - 1.0 });
    let t = if max > min { ((value as f64 - min) / (max - min)).clamp(0.0, 1.0) } else { 0.0 };

    if style.palette.is_empty() {
        let level = (t * 255.0).round() as u8;
        return Ok([level, level, level, 255]);
    }
    let index = (t * (style.palette.len() - 1) as f64).round() as usize;
    let [r, g, b] = parse_hex_color(&style.palette[index])?;
    Ok([r, g, b, 255])
}

fn draw_raster(canvas: &mut RgbaImage, frame: &Frame, raster: &Raster, style: &LayerStyle) -> PipelineResult<()> {
    let crs = CoordinateSystemFactory::from_epsg(raster.grid.epsg)?;
    let transformer = CoordinateTransformer;

    let mut colors: [Option<[u8; 4]>; 256] = [None; 256];
    for y in 0..frame.height {
        for x in 0..frame.width {
            let point = transformer.transform_point(&frame.pixel_center(x, y), &CoordinateSystem::WGS84, &crs);
            let value = match raster.grid.to_pixel(&point).and_then(|(col, row)| raster.get(col, row)) {
                Some(v) => v,
                None => continue,
            };
            let color = match colors[value as usize] {
                Some(c) => c,
                None => {
                    let c = value_color(value, style)?;
                    colors[value as usize] = Some(c);
                    c
                }
            };
            blend(canvas, x, y, color);
        }
    }
    Ok(())
}

fn draw_vector(canvas: &mut RgbaImage, frame: &Frame, shape: &MultiPolygon, style: &LayerStyle) -> PipelineResult<()> {
    let fill = match &style.fill_color {
        Some(c) => {
            let [r, g, b] = parse_hex_color(c)?;
            Some([r, g, b, parse_hex_alpha(c)?])
        }
        None => None,
    };
    if let Some(fill) = fill.filter(|f| f[3] > 0) {
        for y in 0..frame.height {
            for x in 0..frame.width {
                if shape.contains(&frame.pixel_center(x, y)) {
                    blend(canvas, x, y, fill);
                }
            }
        }
    }

    let [r, g, b] = parse_hex_color(style.color.as_deref().unwrap_or("000000"))?;
    let stroke = [r, g, b, 255];
    for polygon in &shape.polygons {
        for ring in std::iter::once(&polygon.exterior).chain(polygon.holes.iter()) {
            for (i, a) in ring.iter().enumerate() {
                let b = &ring[(i + 1) % ring.len()];
                draw_segment(canvas, frame, a, b, stroke);
            }
        }
    }
    Ok(())
}

/// Steps along a segment in half-pixel increments
fn draw_segment(canvas: &mut RgbaImage, frame: &Frame, a: &Point, b: &Point, color: [u8; 4]) {
    let (ax, ay) = frame.to_canvas(a);
    let (bx, by) = frame.to_canvas(b);
    let steps = ((bx - ax).abs().max((by - ay).abs()) * 2.0).ceil().max(1.0) as usize;

    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = (ax + (bx - ax) * t).floor();
        let y = (ay + (by - ay) * t).floor();
        if x >= 0.0 && y >= 0.0 && (x as u32) < frame.width && (y as u32) < frame.height {
            canvas.put_pixel(x as u32, y as u32, Rgba(color));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::{RasterKind, NODATA};
    use crate::coordinate::{GeoGrid, Polygon};

    fn region() -> Region {
        let ring = vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(4.0, 2.0), Point::new(0.0, 2.0)];
        Region::new("Test", MultiPolygon::new(vec![Polygon::new(ring, vec![])])).unwrap()
    }

    fn mask() -> Raster {
        let grid = GeoGrid {
            epsg: 4326,
            origin_x: 0.0,
            origin_y: 2.0,
            pixel_width: 2.0,
            pixel_height: 2.0,
            width: 2,
            height: 1,
        };
        Raster::new(grid, "crop_area", RasterKind::Mask { target: 4 }, vec![1, NODATA]).unwrap()
    }

    #[test]
    fn centred_on_the_region() {
        let view = MapView::centered_on(&region());
        assert_eq!(view.center, Point::new(2.0, 1.0));
        assert_eq!(view.zoom, DEFAULT_ZOOM);
    }

    #[test]
    fn palette_spans_the_value_range() {
        let style = LayerStyle::palette(0.0, 8.0, crate::classes::dynamic_world().palette());
        assert_eq!(value_color(4, &style).unwrap(), [0xE4, 0x96, 0x35, 255]);
        assert_eq!(value_color(1, &LayerStyle::default()).unwrap(), [255, 255, 255, 255]);
    }

    #[test]
    fn renders_layers_bottom_up() {
        let mut view = MapView::centered_on(&region());
        view.add_layer(MapLayer::new(CROP_LAYER, LayerData::Raster(mask()), LayerStyle::default()));
        view.add_layer(MapLayer::new(BOUNDARY_LAYER, LayerData::Vector(region().geometry), LayerStyle::outline()));

        let canvas = view.render(40).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (40, 20));
        // Inside the west half: white mask pixel
        assert_eq!(canvas.get_pixel(10, 10).0, [255, 255, 255, 255]);
        // East half is nodata and the fill is transparent
        assert_eq!(canvas.get_pixel(30, 10).0[3], 0);
        // Boundary stroke along the top edge
        assert_eq!(canvas.get_pixel(20, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn png_preview_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");
        let mut view = MapView::centered_on(&region());
        view.add_layer(MapLayer::new(BOUNDARY_LAYER, LayerData::Vector(region().geometry), LayerStyle::outline()));
        view.render_png(&path, 16).unwrap();
        assert!(image::open(&path).is_ok());
    }

    #[test]
    fn hidden_layers_are_skipped() {
        let mut view = MapView::centered_on(&region());
        view.add_layer(MapLayer::new(CROP_LAYER, LayerData::Raster(mask()), LayerStyle::default()).hidden());
        assert!(view.render(10).is_err());
    }
}
