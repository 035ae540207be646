//! Pipeline configuration
//!
//! Every field has a default equal to the Arunachal Pradesh 2020 cropland
//! run, so an empty file (or no file) reproduces it. Example:
//!
//! ```toml
//! region = "Arunachal Pradesh"
//! boundaries = "data/india_states.geojson"
//! collection = "data/dynamic_world"
//! start = 2020-01-01
//! end = 2021-01-01
//! target_class = 4
//! output_dir = "exports"
//!
//! [[export]]
//! description = "2020_dw_12_cropland_1km"
//! scale = 1000
//! ```

use chrono::NaiveDate;
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::boundary::DEFAULT_NAME_ATTRIBUTE;
use crate::collection::DateRange;
use crate::errors::{PipelineError, PipelineResult};
use crate::export::ExportParams;
use crate::utils::date_utils::deserialize_date;

/// Default preview width in pixels
pub const DEFAULT_PREVIEW_WIDTH: u32 = 800;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Value of the name attribute that selects the region
    pub region: String,
    pub name_attribute: String,
    /// GeoJSON FeatureCollection of administrative boundaries
    pub boundaries: PathBuf,
    /// Directory of label GeoTIFFs
    pub collection: PathBuf,
    #[serde(deserialize_with = "deserialize_date")]
    pub start: NaiveDate,
    /// Exclusive
    #[serde(deserialize_with = "deserialize_date")]
    pub end: NaiveDate,
    pub target_class: u8,
    pub output_dir: PathBuf,
    pub write_stats: bool,
    /// PNG preview of the map view, written when set
    pub preview: Option<PathBuf>,
    pub preview_width: u32,
    /// Show the classified composite layer on the map
    pub show_composite: bool,
    #[serde(rename = "export")]
    pub exports: Vec<ExportParams>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            region: "Arunachal Pradesh".to_string(),
            name_attribute: DEFAULT_NAME_ATTRIBUTE.to_string(),
            boundaries: PathBuf::from("data/india_states.geojson"),
            collection: PathBuf::from("data/dynamic_world"),
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
            target_class: 4,
            output_dir: PathBuf::from("exports"),
            write_stats: true,
            preview: None,
            preview_width: DEFAULT_PREVIEW_WIDTH,
            show_composite: false,
            exports: vec![
                ExportParams::new("2020_dw_12_cropland_1km", 1000.0),
                ExportParams::new("2020_dw_12_cropland_100m", 100.0),
            ],
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(content: &str) -> PipelineResult<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> PipelineResult<Self> {
        info!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn date_range(&self) -> PipelineResult<DateRange> {
        DateRange::new(self.start, self.end)
    }

    /// Applies one compression to every export
    pub fn set_compression(&mut self, compression: &str) {
        for export in &mut self.exports {
            export.compression = compression.to_string();
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.region.trim().is_empty() {
            return Err(PipelineError::Config("region name is empty".to_string()));
        }
        self.date_range()?;
        if self.exports.is_empty() {
            return Err(PipelineError::Config("no exports configured".to_string()));
        }
        for export in &self.exports {
            export.validate()?;
        }
        let mut names: Vec<&str> = self.exports.iter().map(|e| e.description.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(PipelineError::Config(format!("export '{}' is configured twice", pair[0])));
        }
        if self.preview.is_some() && self.preview_width == 0 {
            return Err(PipelineError::Config("preview_width must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_the_default_run() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.region, "Arunachal Pradesh");
        assert_eq!(config.target_class, 4);
        assert_eq!(config.exports[0].description, "2020_dw_12_cropland_1km");
        assert_eq!(config.exports[1].scale, 100.0);
        assert_eq!(config.exports[1].crs_epsg, 4326);
        assert_eq!(config.exports[1].max_pixels, 10_000_000_000);
        config.validate().unwrap();
    }

    #[test]
    fn fields_override_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            region = "Assam"
            start = "2021-01-01"
            end = 2022-01-01
            preview = "assam.png"

            [[export]]
            description = "assam_500m"
            scale = 500
            crs = 32646
            compression = "zstd"
            "#,
        )
        .unwrap();
        assert_eq!(config.region, "Assam");
        assert_eq!(config.date_range().unwrap().end, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(config.exports.len(), 1);
        assert_eq!(config.exports[0].crs_epsg, 32646);
        assert_eq!(config.exports[0].max_pixels, 10_000_000_000);
        assert_eq!(config.preview, Some(PathBuf::from("assam.png")));
        config.validate().unwrap();
    }

    #[test]
    fn invalid_configurations() {
        assert!(matches!(PipelineConfig::from_toml("regoin = \"typo\""), Err(PipelineError::Config(_))));

        let mut config = PipelineConfig::default();
        config.end = config.start;
        assert!(matches!(config.validate(), Err(PipelineError::InvalidDate(_))));

        let mut config = PipelineConfig::default();
        config.exports[1].description = config.exports[0].description.clone();
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }
}
