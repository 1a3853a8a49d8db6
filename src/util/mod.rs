//! Utilities. OBVIOUSLY.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::ops::Deref;
use std::str::FromStr;

pub(crate) mod ser;

/// A library-local representation of a time.
///
/// Chains hand us dates in all kinds of shapes (RFC3339 with a zone, naive
/// `2018-06-15T19:17:47.500` with no zone at all) so we wrap the date in our
/// own type and parse anything reasonable as UTC. Always serializes as
/// RFC3339.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a new Timestamp from the current date/time.
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl Deref for Timestamp {
    type Target = DateTime<Utc>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(naive: NaiveDateTime) -> Self {
        Self(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(date: DateTime<Utc>) -> Self {
        Self(date)
    }
}

impl FromStr for Timestamp {
    type Err = chrono::format::ParseError;
    fn from_str(s: &str) -> std::result::Result<Timestamp, Self::Err> {
        match s.parse::<DateTime<Utc>>() {
            Ok(datetime) => Ok(Timestamp(datetime)),
            Err(_) => {
                let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")?;
                Ok(Timestamp::from(naive))
            }
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl serde::Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

impl<'de> serde::Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Timestamp::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_parses_naive_chain_dates() {
        let ts = Timestamp::from_str("2018-06-15T19:17:47.500").unwrap();
        assert_eq!(ts.timestamp_millis(), 1529090267500);
        let ts2 = Timestamp::from_str("2018-06-15T19:17:47.500Z").unwrap();
        assert_eq!(ts, ts2);
        assert!(Timestamp::from_str("yesterday-ish").is_err());
    }

    #[test]
    fn timestamp_orders_and_serdes() {
        let early = Timestamp::from_str("2018-06-15T19:17:47Z").unwrap();
        let late = Timestamp::from_str("2018-06-15T19:17:48Z").unwrap();
        assert!(early < late);
        let json = serde_json::to_string(&late).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, late);
    }
}
