//! Numeric value types for Slurm JSON responses.
//!
//! Newer Slurm releases wrap optional numbers as `{set, infinite, number}` objects,
//! older ones emit bare integers. `TimeValue` accepts both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Slurm numeric value - represents optional/infinite numbers from Slurm JSON.
///
/// - `NotSet`: The value was not set in Slurm (set=false)
/// - `Infinite`: The value represents infinity (set=true, infinite=true)
/// - `Value(u64)`: A concrete numeric value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeValue {
    #[default]
    NotSet,
    Infinite,
    Value(u64),
}

impl TimeValue {
    /// Returns the numeric value if set and not infinite.
    #[must_use]
    pub fn value(&self) -> Option<u64> {
        match self {
            TimeValue::Value(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value only when it is non-zero (Slurm uses 0 for "unknown" times).
    #[must_use]
    pub fn nonzero(&self) -> Option<u64> {
        self.value().filter(|n| *n > 0)
    }

    /// Convert to a timestamp if this is a concrete, non-zero epoch value.
    #[must_use]
    pub fn to_timestamp(&self) -> Option<DateTime<Utc>> {
        self.nonzero()
            .and_then(|n| DateTime::from_timestamp(n as i64, 0))
    }

    fn from_fields(set: bool, infinite: bool, number: u64) -> Self {
        if !set {
            TimeValue::NotSet
        } else if infinite {
            TimeValue::Infinite
        } else {
            TimeValue::Value(number)
        }
    }
}

/// Wire shapes accepted for a `TimeValue`
#[derive(Deserialize)]
#[serde(untagged)]
enum TimeValueRaw {
    Plain(u64),
    Signed(i64),
    Wrapped {
        #[serde(default)]
        set: bool,
        #[serde(default)]
        infinite: bool,
        #[serde(default)]
        number: u64,
    },
}

impl<'de> Deserialize<'de> for TimeValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match TimeValueRaw::deserialize(deserializer)? {
            TimeValueRaw::Plain(n) => TimeValue::Value(n),
            // Negative numbers only appear as "unset" sentinels
            TimeValueRaw::Signed(_) => TimeValue::NotSet,
            TimeValueRaw::Wrapped {
                set,
                infinite,
                number,
            } => TimeValue::from_fields(set, infinite, number),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_forms() {
        let v: TimeValue =
            serde_json::from_str(r#"{"set":true,"infinite":false,"number":42}"#).unwrap();
        assert_eq!(v, TimeValue::Value(42));

        let v: TimeValue =
            serde_json::from_str(r#"{"set":true,"infinite":true,"number":0}"#).unwrap();
        assert_eq!(v, TimeValue::Infinite);

        let v: TimeValue = serde_json::from_str(r#"{"set":false}"#).unwrap();
        assert_eq!(v, TimeValue::NotSet);
    }

    #[test]
    fn test_plain_numbers() {
        let v: TimeValue = serde_json::from_str("1704067200").unwrap();
        assert_eq!(v.value(), Some(1704067200));
        assert!(v.to_timestamp().is_some());

        let v: TimeValue = serde_json::from_str("-1").unwrap();
        assert_eq!(v, TimeValue::NotSet);
    }

    #[test]
    fn test_zero_is_not_a_timestamp() {
        assert_eq!(TimeValue::Value(0).nonzero(), None);
        assert!(TimeValue::Value(0).to_timestamp().is_none());
        assert!(TimeValue::Infinite.to_timestamp().is_none());
    }
}
