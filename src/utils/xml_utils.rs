//! GDAL metadata XML
//!
//! GDAL keeps dataset and band metadata in tag 42112 as a small XML
//! document of `<Item>` elements. Band names written here show up as the
//! band description in GIS tools.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

use crate::tiff::errors::{TiffError, TiffResult};

const ROOT: &str = "GDALMetadata";
const ITEM: &str = "Item";

/// One `<Item>` of a GDAL metadata block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GdalMetadataItem {
    pub name: String,
    /// Band index for band-level items, None for dataset items
    pub sample: Option<u32>,
    pub role: Option<String>,
    pub value: String,
}

impl GdalMetadataItem {
    /// Dataset-level item
    pub fn dataset(name: &str, value: &str) -> Self {
        GdalMetadataItem {
            name: name.to_string(),
            sample: None,
            role: None,
            value: value.to_string(),
        }
    }

    /// Band description, the item GDAL reports as the band name
    pub fn band_description(sample: u32, description: &str) -> Self {
        GdalMetadataItem {
            name: "DESCRIPTION".to_string(),
            sample: Some(sample),
            role: Some("description".to_string()),
            value: description.to_string(),
        }
    }
}

fn xml_error(e: impl std::fmt::Display) -> TiffError {
    TiffError::GenericError(format!("GDAL metadata XML: {}", e))
}

/// Serialises items into a `<GDALMetadata>` document
pub fn write_gdal_metadata(items: &[GdalMetadataItem]) -> TiffResult<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Start(BytesStart::new(ROOT))).map_err(xml_error)?;

    for item in items {
        let mut start = BytesStart::new(ITEM);
        start.push_attribute(("name", item.name.as_str()));
        let sample = item.sample.map(|s| s.to_string());
        if let Some(sample) = &sample {
            start.push_attribute(("sample", sample.as_str()));
        }
        if let Some(role) = &item.role {
            start.push_attribute(("role", role.as_str()));
        }

        writer.write_event(Event::Start(start)).map_err(xml_error)?;
        writer.write_event(Event::Text(BytesText::new(&item.value))).map_err(xml_error)?;
        writer.write_event(Event::End(BytesEnd::new(ITEM))).map_err(xml_error)?;
    }

    writer.write_event(Event::End(BytesEnd::new(ROOT))).map_err(xml_error)?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(xml_error)
}

/// Parses the `<Item>` elements of a GDAL metadata document
pub fn read_gdal_metadata(xml: &str) -> TiffResult<Vec<GdalMetadataItem>> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut current: Option<GdalMetadataItem> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) if e.name().as_ref() == ITEM.as_bytes() => {
                current = Some(parse_item_attributes(&e)?);
            }
            Event::Empty(e) if e.name().as_ref() == ITEM.as_bytes() => {
                items.push(parse_item_attributes(&e)?);
            }
            Event::Text(text) => {
                if let Some(item) = current.as_mut() {
                    item.value.push_str(&text.unescape().map_err(xml_error)?);
                }
            }
            Event::End(e) if e.name().as_ref() == ITEM.as_bytes() => {
                if let Some(item) = current.take() {
                    items.push(item);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

fn parse_item_attributes(start: &BytesStart) -> TiffResult<GdalMetadataItem> {
    let mut item = GdalMetadataItem::dataset("", "");

    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        match attr.key.as_ref() {
            b"name" => item.name = value,
            b"sample" => item.sample = value.parse().ok(),
            b"role" => item.role = Some(value),
            _ => {}
        }
    }

    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_description_survives_a_round_trip() {
        let items = vec![
            GdalMetadataItem::dataset("SOURCE", "dynamic world <mode>"),
            GdalMetadataItem::band_description(0, "crop_area"),
        ];
        let xml = write_gdal_metadata(&items).unwrap();
        assert!(xml.starts_with("<GDALMetadata>"));
        assert!(xml.contains("role=\"description\""));

        assert_eq!(read_gdal_metadata(&xml).unwrap(), items);
    }

    #[test]
    fn reads_gdal_written_nodata_items() {
        let xml = "<GDALMetadata>\n  <Item name=\"NODATA_VALUES\">255</Item>\n</GDALMetadata>";
        let items = read_gdal_metadata(xml).unwrap();
        assert_eq!(items, vec![GdalMetadataItem::dataset("NODATA_VALUES", "255")]);
    }
}
