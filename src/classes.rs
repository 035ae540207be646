//! Land-cover class table
//!
//! The Dynamic World class enumeration ships with the crate as
//! `dynamic_world.toml` and is parsed once on first use.

use lazy_static::lazy_static;
use log::warn;
use serde::Deserialize;

use crate::errors::{PipelineError, PipelineResult};

lazy_static! {
    static ref DYNAMIC_WORLD: ClassTable = {
        let content = include_str!("../dynamic_world.toml");
        ClassTable::from_toml(content).unwrap_or_else(|e| {
            warn!("Failed to parse the Dynamic World class table: {}", e);
            ClassTable::default()
        })
    };
}

/// The built-in Dynamic World V1 table
pub fn dynamic_world() -> &'static ClassTable {
    &DYNAMIC_WORLD
}

/// One class with its palette colour (`RRGGBB`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LandCoverClass {
    pub code: u8,
    pub name: String,
    pub color: String,
}

impl LandCoverClass {
    pub fn rgb(&self) -> PipelineResult<[u8; 3]> {
        parse_hex_color(&self.color)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ClassTable {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "class")]
    pub classes: Vec<LandCoverClass>,
}

impl ClassTable {
    pub fn from_toml(content: &str) -> PipelineResult<Self> {
        let mut table: ClassTable = toml::from_str(content)?;
        table.classes.sort_by_key(|c| c.code);
        for class in &table.classes {
            class.rgb()?;
        }
        Ok(table)
    }

    pub fn get(&self, code: u8) -> Option<&LandCoverClass> {
        self.classes.iter().find(|c| c.code == code)
    }

    /// Class name, or the code itself for unlisted classes
    pub fn name_of(&self, code: u8) -> String {
        self.get(code).map(|c| c.name.clone()).unwrap_or_else(|| format!("class_{}", code))
    }

    /// Smallest and largest code, the palette's value range
    pub fn code_range(&self) -> Option<(u8, u8)> {
        Some((self.classes.first()?.code, self.classes.last()?.code))
    }

    /// Colours in code order
    pub fn palette(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.color.clone()).collect()
    }
}

/// Parses `RRGGBB` or `RRGGBBAA`, with or without a leading `#`, to RGB
pub fn parse_hex_color(color: &str) -> PipelineResult<[u8; 3]> {
    let hex = color.trim_start_matches('#');
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .ok_or_else(|| PipelineError::InvalidParameter(format!("Invalid colour '{}'", color)))
    };
    if hex.len() != 6 && hex.len() != 8 {
        return Err(PipelineError::InvalidParameter(format!("Invalid colour '{}'", color)));
    }
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

/// Alpha of an `RRGGBBAA` colour; six-digit colours are opaque
pub fn parse_hex_alpha(color: &str) -> PipelineResult<u8> {
    let hex = color.trim_start_matches('#');
    match hex.len() {
        6 => Ok(255),
        8 => hex
            .get(6..8)
            .and_then(|a| u8::from_str_radix(a, 16).ok())
            .ok_or_else(|| PipelineError::InvalidParameter(format!("Invalid colour '{}'", color))),
        _ => Err(PipelineError::InvalidParameter(format!("Invalid colour '{}'", color))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_table_has_nine_classes() {
        let table = dynamic_world();
        assert_eq!(table.classes.len(), 9);
        assert_eq!(table.name_of(4), "crops");
        assert_eq!(table.code_range(), Some((0, 8)));
        assert_eq!(table.get(0).unwrap().rgb().unwrap(), [0x41, 0x9B, 0xDF]);
        assert_eq!(table.name_of(42), "class_42");
    }

    #[test]
    fn colours_parse_with_optional_alpha() {
        assert_eq!(parse_hex_color("#ff0000").unwrap(), [255, 0, 0]);
        assert_eq!(parse_hex_alpha("00000000").unwrap(), 0);
        assert_eq!(parse_hex_alpha("E49635").unwrap(), 255);
        assert!(parse_hex_color("red").is_err());
    }
}
