//! started.json / finished.json decoding
//!
//! Both documents are small JSON objects. The `timestamp` field carries
//! Unix seconds as a number, not an RFC 3339 string, so it goes through
//! [`unix_seconds`] instead of chrono's default serde format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One decoded metadata document.
///
/// Only `finished.json` carries a `result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(with = "unix_seconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl RunMetadata {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Serde adapter for numeric Unix-seconds timestamps.
///
/// Accepts integers and floats; fractional seconds are kept to the
/// nanosecond.
pub mod unix_seconds {
    use chrono::{DateTime, Utc};
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.timestamp())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        deserializer.deserialize_any(UnixSecondsVisitor)
    }

    struct UnixSecondsVisitor;

    impl<'de> Visitor<'de> for UnixSecondsVisitor {
        type Value = DateTime<Utc>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a Unix timestamp in seconds")
        }

        fn visit_i64<E: de::Error>(self, secs: i64) -> Result<Self::Value, E> {
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| E::custom(format!("timestamp {secs} out of range")))
        }

        fn visit_u64<E: de::Error>(self, secs: u64) -> Result<Self::Value, E> {
            let secs = i64::try_from(secs)
                .map_err(|_| E::custom(format!("timestamp {secs} out of range")))?;
            self.visit_i64(secs)
        }

        fn visit_f64<E: de::Error>(self, secs: f64) -> Result<Self::Value, E> {
            if !secs.is_finite() {
                return Err(E::custom("timestamp is not finite"));
            }
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
            DateTime::from_timestamp(whole as i64, nanos)
                .ok_or_else(|| E::custom(format!("timestamp {secs} out of range")))
        }
    }
}
