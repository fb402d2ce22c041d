//! Timestamp formatting shared by the model and the backend clients.
//!
//! Dates encode as UTC ISO-8601 with microsecond precision and a `Z` suffix.
//! Parsing also accepts explicit offsets and missing fractional seconds,
//! which covers the formats the catalog backend emits.

use chrono::{DateTime, NaiveDateTime, Utc};

const ENCODE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";
const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(ENCODE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(date) => Ok(date.with_timezone(&Utc)),
        Err(_) => NaiveDateTime::parse_from_str(value, NAIVE_FORMAT).map(|naive| naive.and_utc()),
    }
}

/// Serde adapter for [`DateTime<Utc>`] fields, `#[serde(with = "...")]`.
pub mod iso {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_date(&text).map_err(de::Error::custom)
    }
}
