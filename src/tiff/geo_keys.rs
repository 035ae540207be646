//! GeoKey directory parsing and construction
//!
//! The GeoKeyDirectoryTag is an array of SHORTs: a 4-value header
//! (version, revision, minor revision, key count) followed by one
//! 4-value entry per key (id, tag location, count, value). Only keys stored
//! directly in the directory (location 0) are needed to identify the EPSG
//! code of a label raster or to describe an exported mask.

use log::debug;

use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{geo_key_directory, geo_keys, model_type, raster_type, tags, units};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

/// EPSG code of the WGS 84 geographic CRS
pub const EPSG_WGS84: u32 = 4326;

/// A single GeoKey entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    pub key_id: u16,
    pub tiff_tag_location: u16,
    pub count: u16,
    pub value_offset: u16,
}

impl GeoKeyEntry {
    pub fn new(key_id: u16, tiff_tag_location: u16, count: u16, value_offset: u16) -> Self {
        GeoKeyEntry { key_id, tiff_tag_location, count, value_offset }
    }

    /// An entry whose value is stored in the directory itself
    pub fn inline(key_id: u16, value: u16) -> Self {
        Self::new(key_id, 0, 1, value)
    }
}

/// Parsed GeoKey directory
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeoKeyDirectory {
    pub entries: Vec<GeoKeyEntry>,
}

impl GeoKeyDirectory {
    /// Parses the SHORT values of a GeoKeyDirectoryTag
    pub fn from_shorts(values: &[u64]) -> TiffResult<Self> {
        if values.len() < 4 {
            return Err(TiffError::GenericError("Invalid GeoKey directory header".to_string()));
        }

        let key_count = values[3] as usize;
        debug!("GeoKey directory: version={}, revision={}.{}, keys={}", values[0], values[1], values[2], key_count);

        if values.len() < 4 + key_count * 4 {
            return Err(TiffError::GenericError(format!(
                "GeoKey directory declares {} keys but holds only {} values",
                key_count,
                values.len()
            )));
        }

        let entries = values[4..4 + key_count * 4]
            .chunks_exact(4)
            .map(|c| GeoKeyEntry::new(c[0] as u16, c[1] as u16, c[2] as u16, c[3] as u16))
            .collect();

        Ok(GeoKeyDirectory { entries })
    }

    /// The minimal directory describing a raster in the given EPSG code
    ///
    /// 4326 gets a geographic model in degrees; anything else is written as
    /// a projected CRS in metres.
    pub fn for_epsg(epsg: u32) -> TiffResult<Self> {
        let code = u16::try_from(epsg)
            .map_err(|_| TiffError::GenericError(format!("EPSG code {} does not fit a GeoKey", epsg)))?;

        let entries = if epsg == EPSG_WGS84 {
            vec![
                GeoKeyEntry::inline(geo_keys::GT_MODEL_TYPE, model_type::GEOGRAPHIC),
                GeoKeyEntry::inline(geo_keys::GT_RASTER_TYPE, raster_type::PIXEL_IS_AREA),
                GeoKeyEntry::inline(geo_keys::GEOGRAPHIC_TYPE, code),
                GeoKeyEntry::inline(geo_keys::GEOG_ANGULAR_UNITS, units::ANGULAR_DEGREE),
            ]
        } else {
            vec![
                GeoKeyEntry::inline(geo_keys::GT_MODEL_TYPE, model_type::PROJECTED),
                GeoKeyEntry::inline(geo_keys::GT_RASTER_TYPE, raster_type::PIXEL_IS_AREA),
                GeoKeyEntry::inline(geo_keys::PROJECTED_CS_TYPE, code),
                GeoKeyEntry::inline(geo_keys::PROJ_LINEAR_UNITS, units::LINEAR_METER),
            ]
        };

        Ok(GeoKeyDirectory { entries })
    }

    /// Serialises the directory back into SHORT values, keys sorted by id
    pub fn to_shorts(&self) -> Vec<u16> {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|e| e.key_id);

        let mut values = vec![
            geo_key_directory::VERSION,
            geo_key_directory::REVISION,
            geo_key_directory::MINOR_REVISION,
            entries.len() as u16,
        ];
        for e in entries {
            values.extend_from_slice(&[e.key_id, e.tiff_tag_location, e.count, e.value_offset]);
        }
        values
    }

    /// Value of a key stored directly in the directory
    pub fn get_short(&self, key_id: u16) -> Option<u16> {
        self.entries
            .iter()
            .find(|e| e.key_id == key_id && e.tiff_tag_location == 0)
            .map(|e| e.value_offset)
    }

    /// EPSG code of the raster's CRS, from the projected or geographic key
    pub fn epsg(&self) -> Option<u32> {
        let projected = self.get_short(geo_keys::PROJECTED_CS_TYPE);
        let geographic = self.get_short(geo_keys::GEOGRAPHIC_TYPE);

        let code = match self.get_short(geo_keys::GT_MODEL_TYPE) {
            Some(model_type::GEOGRAPHIC) => geographic.or(projected),
            _ => projected.or(geographic),
        };

        // 32767 is the GeoTIFF "user-defined" marker, not an EPSG code
        code.filter(|&c| c != 0 && c != 32767).map(u32::from)
    }
}

/// Placement of a north-up raster on the map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoReference {
    pub epsg: u32,
    /// Map coordinates of the top-left corner of the top-left pixel
    pub origin_x: f64,
    pub origin_y: f64,
    /// Pixel size in map units, both positive
    pub pixel_width: f64,
    pub pixel_height: f64,
}

/// Reads EPSG code, pixel scale and tiepoint from an IFD
pub fn read_georeference(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> TiffResult<GeoReference> {
    if !ifd.has_tag(tags::GEO_KEY_DIRECTORY_TAG) {
        return Err(TiffError::MissingGeoreference("GeoKeyDirectory".to_string()));
    }
    let key_values = tiff_reader.read_tag_values(reader, ifd, tags::GEO_KEY_DIRECTORY_TAG)?;
    let directory = GeoKeyDirectory::from_shorts(&key_values)?;
    let epsg = directory
        .epsg()
        .ok_or_else(|| TiffError::MissingGeoreference("EPSG code in GeoKey directory".to_string()))?;

    if !ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG) || !ifd.has_tag(tags::MODEL_TIEPOINT_TAG) {
        return Err(TiffError::MissingGeoreference("ModelPixelScale/ModelTiepoint".to_string()));
    }
    let scale = tiff_reader.read_f64_values(reader, ifd, tags::MODEL_PIXEL_SCALE_TAG)?;
    let tiepoint = tiff_reader.read_f64_values(reader, ifd, tags::MODEL_TIEPOINT_TAG)?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(TiffError::MissingGeoreference("complete pixel scale and tiepoint".to_string()));
    }

    let (pixel_width, pixel_height) = (scale[0].abs(), scale[1].abs());
    if pixel_width == 0.0 || pixel_height == 0.0 {
        return Err(TiffError::MissingGeoreference("non-zero pixel scale".to_string()));
    }

    // Tiepoint (i, j, k, x, y, z) maps raster (i, j) to map (x, y)
    let origin_x = tiepoint[3] - tiepoint[0] * pixel_width;
    let origin_y = tiepoint[4] + tiepoint[1] * pixel_height;

    Ok(GeoReference { epsg, origin_x, origin_y, pixel_width, pixel_height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geographic_directory_round_trips_through_shorts() {
        let dir = GeoKeyDirectory::for_epsg(4326).unwrap();
        let shorts: Vec<u64> = dir.to_shorts().into_iter().map(u64::from).collect();
        assert_eq!(&shorts[..4], &[1, 1, 0, 4]);

        let parsed = GeoKeyDirectory::from_shorts(&shorts).unwrap();
        assert_eq!(parsed.epsg(), Some(4326));
        assert_eq!(parsed.get_short(geo_keys::GT_MODEL_TYPE), Some(model_type::GEOGRAPHIC));
    }

    #[test]
    fn projected_directory_reports_projected_code() {
        let dir = GeoKeyDirectory::for_epsg(32646).unwrap();
        assert_eq!(dir.epsg(), Some(32646));
        assert_eq!(dir.get_short(geo_keys::PROJ_LINEAR_UNITS), Some(units::LINEAR_METER));
    }

    #[test]
    fn truncated_directory_is_rejected() {
        assert!(GeoKeyDirectory::from_shorts(&[1, 1, 0, 2, 1024, 0, 1, 2]).is_err());
    }

    #[test]
    fn user_defined_code_is_not_an_epsg() {
        let dir = GeoKeyDirectory {
            entries: vec![
                GeoKeyEntry::inline(geo_keys::GT_MODEL_TYPE, model_type::PROJECTED),
                GeoKeyEntry::inline(geo_keys::PROJECTED_CS_TYPE, 32767),
            ],
        };
        assert_eq!(dir.epsg(), None);
    }
}
