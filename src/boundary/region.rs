//! Region selection by administrative name

use log::{info, warn};

use super::geojson::BoundaryDataset;
use crate::coordinate::{BoundingBox, MultiPolygon, Point};
use crate::errors::{PipelineError, PipelineResult};

/// Attribute holding first-level administrative names
pub const DEFAULT_NAME_ATTRIBUTE: &str = "NAME_1";

/// A resolved region in EPSG:4326
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub geometry: MultiPolygon,
    pub bbox: BoundingBox,
}

impl Region {
    pub fn new(name: &str, geometry: MultiPolygon) -> PipelineResult<Self> {
        let bbox = geometry
            .bbox()
            .ok_or_else(|| PipelineError::InvalidGeometry(format!("Region '{}' has no vertices", name)))?;
        Ok(Region { name: name.to_string(), geometry, bbox })
    }

    pub fn contains(&self, point: &Point) -> bool {
        self.bbox.contains(point) && self.geometry.contains(point)
    }

    /// Area-weighted centre, falling back to the bbox centre
    pub fn centroid(&self) -> Point {
        self.geometry.centroid().unwrap_or_else(|| self.bbox.center())
    }
}

/// Looks a region up by exact attribute match
pub struct RegionResolver {
    attribute: String,
}

impl RegionResolver {
    pub fn new(attribute: &str) -> Self {
        RegionResolver { attribute: attribute.to_string() }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Resolves `name` to exactly one feature
    ///
    /// No match and several matches are both errors; a lookup never picks
    /// one of several candidates.
    ///
    /// # Arguments
    /// * `dataset` - Boundary features to search
    /// * `name` - Exact value of the name attribute
    ///
    /// # Returns
    /// The region, `RegionNotFound`, or `AmbiguousRegion` with the match count
    pub fn resolve(&self, dataset: &BoundaryDataset, name: &str) -> PipelineResult<Region> {
        let matches: Vec<_> = dataset
            .features
            .iter()
            .filter(|f| f.property_str(&self.attribute) == Some(name))
            .collect();

        match matches.as_slice() {
            [] => {
                warn!("No boundary with {} = '{}'", self.attribute, name);
                Err(PipelineError::RegionNotFound {
                    attribute: self.attribute.clone(),
                    name: name.to_string(),
                })
            }
            [feature] => {
                let geometry = feature
                    .geometry
                    .as_ref()
                    .ok_or_else(|| PipelineError::InvalidGeometry(format!("Region '{}' has no geometry", name)))?
                    .to_multipolygon()?;
                let region = Region::new(name, geometry)?;
                info!(
                    "Resolved region '{}' ({} part(s), bbox {:.4},{:.4} .. {:.4},{:.4})",
                    name,
                    region.geometry.polygons.len(),
                    region.bbox.min_x,
                    region.bbox.min_y,
                    region.bbox.max_x,
                    region.bbox.max_y
                );
                Ok(region)
            }
            many => Err(PipelineError::AmbiguousRegion { name: name.to_string(), count: many.len() }),
        }
    }
}

impl Default for RegionResolver {
    fn default() -> Self {
        RegionResolver::new(DEFAULT_NAME_ATTRIBUTE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"NAME_1":"Arunachal Pradesh","ISO":"IN-AR"},
         "geometry":{"type":"MultiPolygon","coordinates":[
            [[[91.5,26.6],[97.4,26.6],[97.4,29.5],[91.5,29.5],[91.5,26.6]]]]}},
        {"type":"Feature","properties":{"NAME_1":"Assam","ISO":"IN-AS"},
         "geometry":{"type":"Polygon","coordinates":[[[89.7,24.1],[96.0,24.1],[96.0,28.0],[89.7,24.1]]]}},
        {"type":"Feature","properties":{"NAME_1":"Assam","ISO":"IN-AS2"},
         "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}
    ]}"#;

    fn dataset() -> BoundaryDataset {
        BoundaryDataset::from_json(STATES).unwrap()
    }

    #[test]
    fn resolves_a_unique_name() {
        let region = RegionResolver::default().resolve(&dataset(), "Arunachal Pradesh").unwrap();
        assert_eq!(region.bbox, BoundingBox::new(91.5, 26.6, 97.4, 29.5));
        assert!(region.contains(&Point::new(94.0, 28.0)));
        assert!(!region.contains(&Point::new(90.0, 28.0)));
    }

    #[test]
    fn missing_name_is_not_found() {
        let err = RegionResolver::default().resolve(&dataset(), "arunachal pradesh").unwrap_err();
        assert!(matches!(err, PipelineError::RegionNotFound { .. }));
    }

    #[test]
    fn duplicate_names_are_ambiguous() {
        let err = RegionResolver::default().resolve(&dataset(), "Assam").unwrap_err();
        assert!(matches!(err, PipelineError::AmbiguousRegion { count: 2, .. }));
    }

    #[test]
    fn other_attributes_can_be_used() {
        let region = RegionResolver::new("ISO").resolve(&dataset(), "IN-AS").unwrap();
        assert_eq!(region.name, "IN-AS");
        assert_eq!(region.geometry.polygons.len(), 1);
    }
}
