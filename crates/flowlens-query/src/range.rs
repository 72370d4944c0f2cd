//! Time ranges: the half-open interval `(from, to]`.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{QueryError, QueryResult};

/// A range bound as sent by a client: epoch milliseconds or an RFC 3339
/// timestamp string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    Millis(i64),
    Text(String),
}

impl RawTime {
    pub fn parse(&self) -> QueryResult<DateTime<Utc>> {
        match self {
            RawTime::Millis(ms) => from_millis(*ms),
            RawTime::Text(text) => {
                if let Ok(ms) = text.parse::<i64>() {
                    return from_millis(ms);
                }
                DateTime::parse_from_rfc3339(text)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| QueryError::InvalidRange(format!("{text:?}: {e}")))
            }
        }
    }
}

fn from_millis(ms: i64) -> QueryResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| QueryError::InvalidRange(format!("{ms} ms is out of range")))
}

/// `range` object of a request body. Both bounds are optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRange {
    #[serde(default)]
    pub from: Option<RawTime>,
    #[serde(default)]
    pub to: Option<RawTime>,
}

/// Lower bound exclusive, upper bound inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Range between two epoch-millisecond bounds.
    pub fn from_millis(from: i64, to: i64) -> QueryResult<Self> {
        Ok(Self::new(from_millis(from)?, from_millis(to)?))
    }

    /// Everything up to now.
    pub fn unbounded() -> Self {
        Self::new(DateTime::<Utc>::MIN_UTC, Utc::now())
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts > self.from && ts <= self.to
    }

    pub fn contains_millis(&self, ms: i64) -> bool {
        ms > self.from.timestamp_millis() && ms <= self.to.timestamp_millis()
    }
}

/// Apply the defaults: `from` falls back to the earliest representable
/// instant, `to` to the current time.
pub fn normalize_range(from: Option<&RawTime>, to: Option<&RawTime>) -> QueryResult<TimeRange> {
    let from = match from {
        Some(raw) => raw.parse()?,
        None => DateTime::<Utc>::MIN_UTC,
    };
    let to = match to {
        Some(raw) => raw.parse()?,
        None => Utc::now(),
    };
    Ok(TimeRange { from, to })
}

impl RawRange {
    pub fn normalize(&self) -> QueryResult<TimeRange> {
        normalize_range(self.from.as_ref(), self.to.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_exclusive_lower_inclusive_upper() {
        let range = TimeRange::from_millis(1000, 2000).unwrap();
        assert!(!range.contains_millis(1000));
        assert!(range.contains_millis(1001));
        assert!(range.contains_millis(2000));
        assert!(!range.contains_millis(2001));

        assert!(!range.contains(range.from));
        assert!(range.contains(range.to));
    }

    #[test]
    fn defaults_cover_everything_until_now() {
        let before = Utc::now();
        let range = normalize_range(None, None).unwrap();
        assert_eq!(range.from, DateTime::<Utc>::MIN_UTC);
        assert!(range.to >= before);
    }

    #[test]
    fn parses_rfc3339_and_millis() {
        let range = normalize_range(
            Some(&RawTime::Text("2024-01-01T00:00:00.000Z".to_string())),
            Some(&RawTime::Millis(1_704_153_600_000)),
        )
        .unwrap();
        assert_eq!(range.from.timestamp_millis(), 1_704_067_200_000);
        assert_eq!(range.to.timestamp_millis(), 1_704_153_600_000);
    }

    #[test]
    fn numeric_strings_are_millis() {
        let t = RawTime::Text("1500".to_string()).parse().unwrap();
        assert_eq!(t.timestamp_millis(), 1500);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = RawTime::Text("yesterday".to_string()).parse().unwrap_err();
        assert!(matches!(err, QueryError::InvalidRange(_)));
    }

    #[test]
    fn raw_range_deserializes_mixed_forms() {
        let raw: RawRange =
            serde_json::from_str(r#"{"from": 1000, "to": "2024-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(raw.from, Some(RawTime::Millis(1000)));
        let range = raw.normalize().unwrap();
        assert_eq!(range.from.timestamp_millis(), 1000);
    }
}
