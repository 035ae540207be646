//! GeoJSON boundary datasets
//!
//! Only what administrative boundary files use: a FeatureCollection of
//! Polygon or MultiPolygon features with a flat property map.

use log::{debug, info};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::coordinate::{MultiPolygon, Point, Polygon};
use crate::errors::{PipelineError, PipelineResult};

/// A GeoJSON geometry, positions kept as raw number lists
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum RawGeometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoundaryFeature {
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
}

impl BoundaryFeature {
    /// String value of a property, None when absent or not a string
    pub fn property_str(&self, attribute: &str) -> Option<&str> {
        self.properties.as_ref()?.get(attribute)?.as_str()
    }
}

/// A loaded boundary FeatureCollection
#[derive(Debug, Clone, Deserialize)]
pub struct BoundaryDataset {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<BoundaryFeature>,
}

impl BoundaryDataset {
    /// Reads a FeatureCollection from a file
    ///
    /// # Arguments
    /// * `path` - GeoJSON file
    ///
    /// # Returns
    /// The dataset, or an error if the file is not a FeatureCollection
    pub fn load(path: &Path) -> PipelineResult<Self> {
        info!("Loading boundaries from {}", path.display());
        let reader = BufReader::new(File::open(path)?);
        let dataset: BoundaryDataset = serde_json::from_reader(reader)?;
        dataset.validate()
    }

    /// Parses a FeatureCollection from a string
    pub fn from_json(json: &str) -> PipelineResult<Self> {
        let dataset: BoundaryDataset = serde_json::from_str(json)?;
        dataset.validate()
    }

    fn validate(self) -> PipelineResult<Self> {
        if self.kind != "FeatureCollection" {
            return Err(PipelineError::InvalidGeometry(format!(
                "Expected a FeatureCollection, found '{}'",
                self.kind
            )));
        }
        debug!("Boundary dataset holds {} features", self.features.len());
        Ok(self)
    }
}

fn to_point(position: &[f64]) -> PipelineResult<Point> {
    match position {
        [x, y, ..] => Ok(Point::new(*x, *y)),
        _ => Err(PipelineError::InvalidGeometry(format!(
            "Position needs at least 2 coordinates, got {}",
            position.len()
        ))),
    }
}

fn to_polygon(rings: &[Vec<Vec<f64>>]) -> PipelineResult<Polygon> {
    let mut rings = rings.iter().map(|ring| {
        if ring.len() < 3 {
            return Err(PipelineError::InvalidGeometry(format!("Ring with {} positions", ring.len())));
        }
        ring.iter().map(|p| to_point(p)).collect::<PipelineResult<Vec<Point>>>()
    });

    let exterior = rings
        .next()
        .ok_or_else(|| PipelineError::InvalidGeometry("Polygon without rings".to_string()))??;
    let holes = rings.collect::<PipelineResult<Vec<_>>>()?;
    Ok(Polygon::new(exterior, holes))
}

impl RawGeometry {
    /// Converts to a multipolygon; other geometry types are rejected
    pub fn to_multipolygon(&self) -> PipelineResult<MultiPolygon> {
        match self {
            RawGeometry::Polygon { coordinates } => Ok(MultiPolygon::new(vec![to_polygon(coordinates)?])),
            RawGeometry::MultiPolygon { coordinates } => {
                let polygons = coordinates
                    .iter()
                    .map(|p| to_polygon(p))
                    .collect::<PipelineResult<Vec<_>>>()?;
                if polygons.is_empty() {
                    return Err(PipelineError::InvalidGeometry("Empty MultiPolygon".to_string()));
                }
                Ok(MultiPolygon::new(polygons))
            }
            RawGeometry::Unsupported => Err(PipelineError::InvalidGeometry(
                "Only Polygon and MultiPolygon boundaries are supported".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_polygons_with_elevation() {
        let json = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"NAME_1":"A"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0,5],[1,0,5],[1,1,5],[0,0,5]]]}}]}"#;
        let dataset = BoundaryDataset::from_json(json).unwrap();
        assert_eq!(dataset.features[0].property_str("NAME_1"), Some("A"));

        let shape = dataset.features[0].geometry.as_ref().unwrap().to_multipolygon().unwrap();
        assert_eq!(shape.polygons[0].exterior.len(), 4);
    }

    #[test]
    fn point_geometries_are_rejected() {
        let json = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[1,2]}}]}"#;
        let dataset = BoundaryDataset::from_json(json).unwrap();
        let err = dataset.features[0].geometry.as_ref().unwrap().to_multipolygon().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidGeometry(_)));
    }

    #[test]
    fn bare_features_are_not_collections() {
        let json = r#"{"type":"Feature","features":[]}"#;
        assert!(matches!(BoundaryDataset::from_json(json), Err(PipelineError::InvalidGeometry(_))));
    }

    #[test]
    fn malformed_json_is_a_geojson_error() {
        assert!(matches!(BoundaryDataset::from_json("{"), Err(PipelineError::GeoJson(_))));
    }
}
