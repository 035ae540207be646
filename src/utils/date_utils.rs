//! Date parsing for acquisition stamps and configuration values

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use crate::errors::{PipelineError, PipelineResult};

/// Parses `YYYY-MM-DD` or the compact `YYYYMMDD` form
pub fn parse_date(value: &str) -> PipelineResult<NaiveDate> {
    let value = value.trim();
    let format = if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
        "%Y%m%d"
    } else {
        "%Y-%m-%d"
    };
    NaiveDate::parse_from_str(value, format)
        .map_err(|e| PipelineError::InvalidDate(format!("'{}': {}", value, e)))
}

/// Serde adapter accepting a date string or a bare TOML local date
pub fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let value = toml::Value::deserialize(deserializer)?;
    let text = match value {
        toml::Value::String(s) => s,
        toml::Value::Datetime(dt) => dt.to_string(),
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected a date, found {}",
                other.type_str()
            )))
        }
    };
    parse_date(&text).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Dated {
        #[serde(deserialize_with = "deserialize_date")]
        date: NaiveDate,
    }

    #[test]
    fn both_stamp_forms_parse() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 5).unwrap();
        assert_eq!(parse_date("2020-01-05").unwrap(), expected);
        assert_eq!(parse_date("20200105").unwrap(), expected);
        assert!(matches!(parse_date("2020-13-01"), Err(PipelineError::InvalidDate(_))));
    }

    #[test]
    fn toml_dates_may_be_quoted_or_bare() {
        let bare: Dated = toml::from_str("date = 2020-03-01").unwrap();
        let quoted: Dated = toml::from_str("date = \"2020-03-01\"").unwrap();
        assert_eq!(bare.date, quoted.date);
    }
}
