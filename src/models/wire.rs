//! Lenient field codecs for JSON produced by clients and the document store.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            Self::Number(value) => Ok(value),
            Self::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid number {text:?}"))),
        }
    }
}

/// Coordinate given as a JSON number or a numeric string; `null` is the zero sentinel.
pub fn coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(value) => value.into_f64(),
        None => Ok(0.0),
    }
}

/// Decimal text of a stored coordinate. Whole degrees keep one fractional
/// digit (`7.0`, not `7`) to match documents already in the collection.
pub fn format_coordinate(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e7 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Coordinates are stored as decimal strings so that equality queries match.
pub fn coordinate_as_string<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_coordinate(*value))
}

/// Unix seconds as a number or numeric string.
pub fn epoch_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(value) => {
            let seconds: f64 = value.into_f64()?;
            if seconds.is_finite() {
                Ok(Some(seconds.trunc() as i64))
            } else {
                Err(D::Error::custom("timestamp is not finite"))
            }
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "coordinate")]
        value: f64,
        #[serde(default, deserialize_with = "epoch_seconds")]
        at: Option<i64>,
    }

    fn probe(json: &str) -> Result<Probe, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_coordinate_forms() {
        assert_eq!(probe(r#"{"value": 12.5}"#).unwrap().value, 12.5);
        assert_eq!(probe(r#"{"value": 7}"#).unwrap().value, 7.0);
        assert_eq!(probe(r#"{"value": " -3.25 "}"#).unwrap().value, -3.25);
        assert_eq!(probe(r#"{"value": null}"#).unwrap().value, 0.0);
        assert_eq!(probe(r#"{}"#).unwrap().value, 0.0);
    }

    #[test]
    fn test_coordinate_rejects_garbage() {
        assert!(probe(r#"{"value": "north"}"#).is_err());
    }

    #[test]
    fn test_format_coordinate() {
        assert_eq!(format_coordinate(7.0), "7.0");
        assert_eq!(format_coordinate(-12.0), "-12.0");
        assert_eq!(format_coordinate(0.0), "0.0");
        assert_eq!(format_coordinate(50.9413), "50.9413");
        assert_eq!(format_coordinate(-3.25), "-3.25");
    }

    #[test]
    fn test_epoch_seconds_forms() {
        assert_eq!(probe(r#"{"at": 1700000000}"#).unwrap().at, Some(1_700_000_000));
        assert_eq!(probe(r#"{"at": "1700000000"}"#).unwrap().at, Some(1_700_000_000));
        assert_eq!(probe(r#"{}"#).unwrap().at, None);
    }
}
