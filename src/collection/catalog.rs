//! Image discovery for a collection directory
//!
//! A `catalog.toml` manifest wins when present:
//!
//! ```toml
//! [[image]]
//! id = "20200105T045211_20200105T045442_T46RDQ"
//! date = 2020-01-05
//! path = "20200105T045211_20200105T045442_T46RDQ.tif"
//! ```
//!
//! Otherwise every GeoTIFF whose name starts with a `YYYYMMDD` stamp is
//! taken as an image acquired on that date.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{PipelineError, PipelineResult};
use crate::utils::date_utils::{deserialize_date, parse_date};

/// Manifest file name looked up in a collection directory
pub const CATALOG_FILE: &str = "catalog.toml";

lazy_static! {
    static ref DATE_STAMP: Regex = Regex::new(r"^(\d{8})").expect("valid date stamp pattern");
}

/// One image listed by a catalog
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    /// Relative paths are resolved against the collection directory
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default, rename = "image")]
    pub images: Vec<CatalogEntry>,
}

impl Catalog {
    /// Parses a manifest; entry paths are made absolute against `base`
    pub fn from_toml(content: &str, base: &Path) -> PipelineResult<Self> {
        let mut catalog: Catalog = toml::from_str(content)?;
        for entry in &mut catalog.images {
            if entry.path.is_relative() {
                entry.path = base.join(&entry.path);
            }
        }
        Ok(catalog)
    }

    /// Reads `catalog.toml` from `dir`, or scans `dir` when there is none
    ///
    /// # Arguments
    /// * `dir` - Collection directory
    ///
    /// # Returns
    /// The catalog entries, or an error if `dir` is missing or the manifest is
    /// invalid
    pub fn discover(dir: &Path) -> PipelineResult<Self> {
        if !dir.is_dir() {
            return Err(PipelineError::InvalidParameter(format!(
                "Collection directory not found: {}",
                dir.display()
            )));
        }

        let manifest = dir.join(CATALOG_FILE);
        if manifest.is_file() {
            info!("Reading image catalog {}", manifest.display());
            let content = fs::read_to_string(&manifest)?;
            return Self::from_toml(&content, dir);
        }

        info!("No {} in {}, scanning file names", CATALOG_FILE, dir.display());
        Self::scan(dir)
    }

    fn scan(dir: &Path) -> PipelineResult<Self> {
        let mut images = Vec::new();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_tiff = path
                .extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy().to_lowercase();
                    ext == "tif" || ext == "tiff"
                })
                .unwrap_or(false);
            if !path.is_file() || !is_tiff {
                continue;
            }

            let id = match path.file_stem() {
                Some(stem) => stem.to_string_lossy().to_string(),
                None => continue,
            };
            match date_from_id(&id) {
                Some(date) => {
                    debug!("Found image {} acquired {}", id, date);
                    images.push(CatalogEntry { id, date, path });
                }
                None => warn!("Skipping {}: no YYYYMMDD acquisition stamp", path.display()),
            }
        }

        Ok(Catalog { images })
    }
}

/// Acquisition date encoded at the start of an image id
pub fn date_from_id(id: &str) -> Option<NaiveDate> {
    let stamp = DATE_STAMP.captures(id)?.get(1)?;
    parse_date(stamp.as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_their_acquisition_date() {
        assert_eq!(
            date_from_id("20200105T045211_20200105T045442_T46RDQ"),
            NaiveDate::from_ymd_opt(2020, 1, 5)
        );
        assert_eq!(date_from_id("T46RDQ_20200105"), None);
        assert_eq!(date_from_id("20201345_bad_month"), None);
    }

    #[test]
    fn manifest_paths_resolve_against_the_directory() {
        let toml = r#"
            [[image]]
            id = "a"
            date = 2020-02-01
            path = "a.tif"

            [[image]]
            id = "b"
            date = "2020-03-01"
            path = "/data/b.tif"
        "#;
        let catalog = Catalog::from_toml(toml, Path::new("/collections/dw")).unwrap();
        assert_eq!(catalog.images.len(), 2);
        assert_eq!(catalog.images[0].path, PathBuf::from("/collections/dw/a.tif"));
        assert_eq!(catalog.images[1].path, PathBuf::from("/data/b.tif"));
        assert_eq!(catalog.images[1].date, NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
    }

    #[test]
    fn scanning_skips_unstamped_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("20200105T000000_x.tif"), b"").unwrap();
        fs::write(dir.path().join("readme.tif"), b"").unwrap();
        fs::write(dir.path().join("20200106_notes.txt"), b"").unwrap();

        let catalog = Catalog::discover(dir.path()).unwrap();
        assert_eq!(catalog.images.len(), 1);
        assert_eq!(catalog.images[0].id, "20200105T000000_x");
    }
}
