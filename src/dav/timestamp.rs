//! HTTP-date timestamps.
//!
//! Resource modification times travel both as the `getlastmodified`
//! property and as the `Last-Modified` header. Clients compare them as
//! opaque strings and as parsed instants, so the codec must round-trip
//! exactly at its supported precision (whole seconds, UTC).

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::dav::error::DavError;

/// RFC 7231 IMF-fixdate, e.g. `Sun, 25 Aug 2024 08:27:42 GMT`.
const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// A UTC instant at whole-second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Truncates sub-second precision; the wire format cannot carry it.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        DateTime::<Utc>::from_timestamp(dt.timestamp(), 0)
            .map(Self)
            .unwrap_or(Self(dt))
    }

    /// Instant from seconds since the Unix epoch, if representable.
    pub fn from_unix(secs: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(secs, 0).map(Self)
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Canonical text encoding. Total over the representable range.
    pub fn encode(&self) -> String {
        self.0.format(IMF_FIXDATE).to_string()
    }

    /// Parse the canonical encoding. Anything else is a format error.
    pub fn decode(text: &str) -> Result<Self, DavError> {
        let naive = NaiveDateTime::parse_from_str(text, IMF_FIXDATE).map_err(|_| {
            DavError::InvalidTimestamp {
                input: text.to_string(),
            }
        })?;
        Ok(Self(Utc.from_utc_datetime(&naive)))
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Timestamp::decode(&text).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_round_trip() {
        let ts = Timestamp::from_unix(1_724_574_462).unwrap();
        let text = ts.encode();
        assert_eq!(text, "Sun, 25 Aug 2024 08:27:42 GMT");
        assert_eq!(Timestamp::decode(&text).unwrap(), ts);
    }

    #[test]
    fn test_encode_is_stable() {
        let ts = Timestamp::now();
        assert_eq!(ts.encode(), ts.encode());
        assert_eq!(Timestamp::decode(&ts.encode()).unwrap().encode(), ts.encode());
    }

    #[test]
    fn test_subsecond_precision_dropped() {
        let dt = Utc::now() + Duration::nanoseconds(123_456_789);
        let ts = Timestamp::from_datetime(dt);
        let round = Timestamp::decode(&ts.encode()).unwrap();
        assert_eq!(round, ts);
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        for text in ["", "yesterday", "2024-08-25T08:27:42Z", "Sun, 25 Aug 2024"] {
            assert!(matches!(
                Timestamp::decode(text),
                Err(DavError::InvalidTimestamp { .. })
            ));
        }
    }

    #[test]
    fn test_decode_rejects_wrong_weekday() {
        // Aug 25 2024 was a Sunday.
        assert!(Timestamp::decode("Mon, 25 Aug 2024 08:27:42 GMT").is_err());
    }
}
