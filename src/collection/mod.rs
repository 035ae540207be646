//! Label image collections
//!
//! A collection is an ordered set of single-band label GeoTIFFs. Filters
//! return new collections and never touch pixel data.

mod catalog;
mod image;

pub use self::catalog::{date_from_id, Catalog, CatalogEntry, CATALOG_FILE};
pub use self::image::{ImageRecord, LabelBand};

use chrono::NaiveDate;
use log::{debug, info};
use std::path::Path;

use crate::coordinate::BoundingBox;
use crate::errors::{PipelineError, PipelineResult};

/// Half-open acquisition date range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Half-open range `[start, end)`
    ///
    /// # Returns
    /// The range, or `InvalidDate` unless `start < end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> PipelineResult<Self> {
        if start >= end {
            return Err(PipelineError::InvalidDate(format!(
                "Range start {} is not before its end {}",
                start, end
            )));
        }
        Ok(DateRange { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// Images ordered by acquisition date, then id
#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
    images: Vec<ImageRecord>,
}

impl ImageCollection {
    pub fn new(mut images: Vec<ImageRecord>) -> Self {
        images.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        ImageCollection { images }
    }

    /// Opens every image a catalog lists
    pub fn from_catalog(catalog: &Catalog) -> PipelineResult<Self> {
        let images = catalog
            .images
            .iter()
            .map(|entry| ImageRecord::open(&entry.id, entry.date, &entry.path))
            .collect::<PipelineResult<Vec<_>>>()?;
        Ok(Self::new(images))
    }

    /// Discovers and opens the images in a directory
    ///
    /// # Arguments
    /// * `dir` - Directory holding `catalog.toml` or date-stamped GeoTIFFs
    ///
    /// # Returns
    /// The collection sorted by date, or the first image that cannot be opened
    pub fn from_directory(dir: &Path) -> PipelineResult<Self> {
        let collection = Self::from_catalog(&Catalog::discover(dir)?)?;
        info!("Collection {} holds {} images", dir.display(), collection.len());
        Ok(collection)
    }

    /// Images acquired inside the range
    pub fn filter_date(&self, range: &DateRange) -> ImageCollection {
        let images: Vec<_> = self.images.iter().filter(|i| range.contains(i.date)).cloned().collect();
        debug!("Date filter {}..{} keeps {} of {} images", range.start, range.end, images.len(), self.len());
        ImageCollection { images }
    }

    /// Images whose footprint intersects an EPSG:4326 box
    pub fn filter_bounds(&self, bounds: &BoundingBox) -> ImageCollection {
        let images: Vec<_> = self.images.iter().filter(|i| i.footprint.intersects(bounds)).cloned().collect();
        debug!("Bounds filter keeps {} of {} images", images.len(), self.len());
        ImageCollection { images }
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageRecord> {
        self.images.iter()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Union of all footprints, None for an empty collection
    pub fn footprint(&self) -> Option<BoundingBox> {
        self.images.iter().map(|i| i.footprint).reduce(|a, b| a.union(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::{CoordinateSystem, GeoGrid};
    use std::path::PathBuf;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(id: &str, date: NaiveDate, min_x: f64) -> ImageRecord {
        ImageRecord {
            id: id.to_string(),
            date,
            path: PathBuf::from(format!("{}.tif", id)),
            grid: GeoGrid {
                epsg: 4326,
                origin_x: min_x,
                origin_y: 1.0,
                pixel_width: 1.0,
                pixel_height: 1.0,
                width: 1,
                height: 1,
            },
            crs: CoordinateSystem::WGS84,
            nodata: None,
            footprint: BoundingBox::new(min_x, 0.0, min_x + 1.0, 1.0),
        }
    }

    fn sample() -> ImageCollection {
        ImageCollection::new(vec![
            record("b", date(2020, 6, 1), 0.0),
            record("c", date(2021, 1, 1), 0.0),
            record("a", date(2020, 6, 1), 5.0),
            record("z", date(2019, 12, 31), 0.0),
            record("d", date(2020, 1, 1), 0.0),
        ])
    }

    #[test]
    fn ordered_by_date_then_id() {
        let c = sample();
        let ids: Vec<&str> = c.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "d", "a", "b", "c"]);
    }

    #[test]
    fn date_range_is_half_open() {
        let range = DateRange::new(date(2020, 1, 1), date(2021, 1, 1)).unwrap();
        let ids: Vec<String> = sample().filter_date(&range).iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec!["d", "a", "b"]);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(DateRange::new(date(2021, 1, 1), date(2020, 1, 1)).is_err());
        assert!(DateRange::new(date(2020, 1, 1), date(2020, 1, 1)).is_err());
    }

    #[test]
    fn bounds_filter_uses_footprints() {
        let kept = sample().filter_bounds(&BoundingBox::new(4.5, 0.2, 6.0, 0.8));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.images()[0].id, "a");
        assert!(sample().filter_bounds(&BoundingBox::new(20.0, 20.0, 21.0, 21.0)).is_empty());
    }
}
