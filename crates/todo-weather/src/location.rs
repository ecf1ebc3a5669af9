//! Geographic point attached to a task.
//!
//! The task form submits locations as `"<lat>::<lon>::<label>"`, for example
//! `"51.5072::-0.1276::London, UK"`. The label is kept verbatim, commas and
//! surrounding spaces included.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const SEPARATOR: &str = "::";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub label: String,
}

/// Why a location string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationParseError {
    #[error("expected 3 '::'-separated parts, got {0}")]
    PartCount(usize),
    #[error("latitude is not a number: {0:?}")]
    Latitude(String),
    #[error("longitude is not a number: {0:?}")]
    Longitude(String),
    #[error("label is empty")]
    EmptyLabel,
    #[error("location must be a string")]
    NotText,
}

impl Location {
    pub fn new(lat: f64, lon: f64, label: impl Into<String>) -> Self {
        Self {
            lat,
            lon,
            label: label.into(),
        }
    }

    /// Parse a form value, yielding `None` for anything malformed.
    pub fn parse(value: &str) -> Option<Self> {
        value.parse().ok()
    }

    /// Parse a raw form field. Non-string values yield `None`.
    pub fn from_form_value(value: &serde_json::Value) -> Option<Self> {
        value.as_str().and_then(Self::parse)
    }
}

fn parse_coordinate(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

impl FromStr for Location {
    type Err = LocationParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.split(SEPARATOR).collect();
        let [lat, lon, label] = parts.as_slice() else {
            return Err(LocationParseError::PartCount(parts.len()));
        };

        let lat = parse_coordinate(lat).ok_or_else(|| LocationParseError::Latitude(lat.to_string()))?;
        let lon =
            parse_coordinate(lon).ok_or_else(|| LocationParseError::Longitude(lon.to_string()))?;

        if label.is_empty() {
            return Err(LocationParseError::EmptyLabel);
        }

        Ok(Self::new(lat, lon, *label))
    }
}

impl TryFrom<&serde_json::Value> for Location {
    type Error = LocationParseError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        value
            .as_str()
            .ok_or(LocationParseError::NotText)?
            .parse()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}{SEPARATOR}{}", self.lat, self.lon, self.label)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_keeps_label_commas() {
        assert_eq!(
            Location::parse("1.0::2.0::sample, label"),
            Some(Location::new(1.0, 2.0, "sample, label"))
        );
    }

    #[test]
    fn test_parse_integer_and_negative() {
        assert_eq!(
            Location::parse("0::-1::sample"),
            Some(Location::new(0.0, -1.0, "sample"))
        );
    }

    #[test]
    fn test_parse_label_not_trimmed() {
        let loc = Location::parse("45.12::1.23:: Sample location ").unwrap();
        assert_eq!(loc.label, " Sample location ");
    }

    #[test]
    fn test_parse_coordinates_tolerate_padding() {
        let loc = Location::parse(" 45.12 :: -1.5 ::x").unwrap();
        assert_eq!(loc.lat, 45.12);
        assert_eq!(loc.lon, -1.5);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for value in ["1", "1::2", "a::b", "1::b::c", "a::1::c", "1::2::3::4", "", "::::"] {
            assert_eq!(Location::parse(value), None, "{value:?} should be rejected");
        }
    }

    #[test]
    fn test_parse_rejects_non_finite() {
        assert_eq!(Location::parse("NaN::1::x"), None);
        assert_eq!(Location::parse("1::inf::x"), None);
    }

    #[test]
    fn test_parse_rejects_empty_label() {
        assert_eq!(
            "1::2::".parse::<Location>(),
            Err(LocationParseError::EmptyLabel)
        );
    }

    #[test]
    fn test_parse_error_reasons() {
        assert_eq!(
            "1::2".parse::<Location>(),
            Err(LocationParseError::PartCount(2))
        );
        assert_eq!(
            "x::2::y".parse::<Location>(),
            Err(LocationParseError::Latitude("x".to_string()))
        );
        assert_eq!(
            "1::y::z".parse::<Location>(),
            Err(LocationParseError::Longitude("y".to_string()))
        );
    }

    #[test]
    fn test_form_value_non_text() {
        for value in [json!({}), json!([]), json!(null), json!(12.5), json!(true)] {
            assert_eq!(Location::from_form_value(&value), None);
        }
        assert_eq!(
            Location::try_from(&json!(["1", "2", "x"])),
            Err(LocationParseError::NotText)
        );
    }

    #[test]
    fn test_form_value_text() {
        assert_eq!(
            Location::from_form_value(&json!("51.5::-0.12::London")),
            Some(Location::new(51.5, -0.12, "London"))
        );
    }

    #[test]
    fn test_display_round_trip() {
        let locations = [
            Location::new(51.5072, -0.1276, "London, UK"),
            Location::new(0.0, 0.0, "Null Island"),
            Location::new(-33.8688, 151.2093, " spaced "),
            Location::new(1e-7, -179.999_999, "tiny: value"),
        ];
        for loc in locations {
            assert_eq!(Location::parse(&loc.to_string()), Some(loc.clone()));
        }
    }

    #[test]
    fn test_display_format() {
        assert_eq!(Location::new(1.5, -2.0, "a").to_string(), "1.5::-2::a");
    }
}
