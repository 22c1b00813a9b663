//! RFC 3339 (de)serialization for `SystemTime` fields.
use chrono::{DateTime, Local};
use serde::{self, Deserialize, Deserializer, Serializer};
use std::time::SystemTime;

/// Formats a `SystemTime` as a local RFC 3339 string.
pub fn format_timestamp(time: &SystemTime) -> String {
    let datetime: DateTime<Local> = (*time).into();
    datetime.to_rfc3339()
}

pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(time))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s)
        .map(SystemTime::from)
        .map_err(serde::de::Error::custom)
}
