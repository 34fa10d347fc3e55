//! Human-readable durations, byte sizes, and timestamps

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    #[error("Value out of range: {0}")]
    Overflow(String),
}

/// Split `"15m"` into `(15, "M")`. A bare number has an empty unit.
fn split_unit(input: &str) -> Result<(u64, String), ParseError> {
    let s = input.trim().to_uppercase();
    let pos = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if pos == 0 {
        return Err(ParseError::InvalidFormat(input.to_string()));
    }
    let number: u64 = s[..pos].parse()?;
    Ok((number, s[pos..].trim().to_string()))
}

/// Duration wrapper accepting `"30s"`, `"5m"`, `"1h"`, `"2d"` or plain seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for HumanDuration {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (number, unit) = split_unit(s)?;
        let multiplier = match unit.as_str() {
            "" | "S" | "SEC" | "SECS" => 1,
            "M" | "MIN" | "MINS" => 60,
            "H" | "HR" | "HOURS" => 60 * 60,
            "D" | "DAYS" => 24 * 60 * 60,
            _ => return Err(ParseError::InvalidUnit(unit)),
        };
        let secs = number
            .checked_mul(multiplier)
            .ok_or_else(|| ParseError::Overflow(s.to_string()))?;
        Ok(Self::from_secs(secs))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.as_secs();
        match secs {
            0 => f.write_str("0s"),
            s if s % 86_400 == 0 => write!(f, "{}d", s / 86_400),
            s if s % 3_600 == 0 => write!(f, "{}h", s / 3_600),
            s if s % 60 == 0 => write!(f, "{}m", s / 60),
            s => write!(f, "{s}s"),
        }
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct DurationVisitor;

        impl<'de> serde::de::Visitor<'de> for DurationVisitor {
            type Value = HumanDuration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a duration as string (e.g., \"30s\", \"5m\") or seconds")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(HumanDuration::from_secs(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(HumanDuration::from_secs)
                    .map_err(|_| E::custom("duration must not be negative"))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse::<HumanDuration>().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}

/// Byte size wrapper accepting `"64KB"`, `"1MiB"` or plain bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl FromStr for ByteSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (number, unit) = split_unit(s)?;
        let multiplier: u64 = match unit.as_str() {
            "" | "B" => 1,
            "K" | "KB" | "KIB" => 1024,
            "M" | "MB" | "MIB" => 1024 * 1024,
            _ => return Err(ParseError::InvalidUnit(unit)),
        };
        number
            .checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| ParseError::Overflow(s.to_string()))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            n if n >= 1024 * 1024 && n % (1024 * 1024) == 0 => write!(f, "{}MB", n / (1024 * 1024)),
            n if n >= 1024 && n % 1024 == 0 => write!(f, "{}KB", n / 1024),
            n => write!(f, "{n}B"),
        }
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ByteSizeVisitor;

        impl<'de> serde::de::Visitor<'de> for ByteSizeVisitor {
            type Value = ByteSize;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a byte size as string (e.g., \"64KB\") or integer")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(ByteSize(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(ByteSize)
                    .map_err(|_| E::custom("byte size must not be negative"))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse::<ByteSize>().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(ByteSizeVisitor)
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Render like `October 19th 2026, 3:04:05 pm UTC`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    let day = at.day();
    format!(
        "{} {}{} {}, {} UTC",
        at.format("%B"),
        day,
        ordinal_suffix(day),
        at.format("%Y"),
        at.format("%-I:%M:%S %P"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_durations() {
        assert_eq!("30".parse::<HumanDuration>().unwrap().as_secs(), 30);
        assert_eq!("30s".parse::<HumanDuration>().unwrap().as_secs(), 30);
        assert_eq!("5m".parse::<HumanDuration>().unwrap().as_secs(), 300);
        assert_eq!("1h".parse::<HumanDuration>().unwrap().as_secs(), 3600);
        assert_eq!("2D".parse::<HumanDuration>().unwrap().as_secs(), 172_800);
    }

    #[test]
    fn test_parse_duration_errors() {
        assert!("m".parse::<HumanDuration>().is_err());
        assert!("5 weeks".parse::<HumanDuration>().is_err());
        assert!("".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_duration_display() {
        assert_eq!(HumanDuration::from_secs(300).to_string(), "5m");
        assert_eq!(HumanDuration::from_secs(90).to_string(), "90s");
        assert_eq!(HumanDuration::from_secs(7200).to_string(), "2h");
    }

    #[test]
    fn test_deserialize_duration() {
        #[derive(Deserialize)]
        struct TestStruct {
            skew: HumanDuration,
            ttl: HumanDuration,
        }
        let parsed: TestStruct = serde_json::from_str(r#"{"skew": "5m", "ttl": 600}"#).unwrap();
        assert_eq!(parsed.skew.as_secs(), 300);
        assert_eq!(parsed.ttl.as_secs(), 600);
    }

    #[test]
    fn test_parse_byte_sizes() {
        assert_eq!("1024".parse::<ByteSize>().unwrap().as_u64(), 1024);
        assert_eq!("64KB".parse::<ByteSize>().unwrap().as_u64(), 64 * 1024);
        assert_eq!("1MiB".parse::<ByteSize>().unwrap().as_u64(), 1024 * 1024);
        assert!("1XB".parse::<ByteSize>().is_err());
        assert_eq!(ByteSize(64 * 1024).to_string(), "64KB");
    }

    #[test]
    fn test_format_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 15, 4, 5).unwrap();
        assert_eq!(format_timestamp(at), "October 19th 2026, 3:04:05 pm UTC");

        let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 30, 0).unwrap();
        assert_eq!(format_timestamp(at), "March 1st 2026, 12:30:00 am UTC");

        let at = Utc.with_ymd_and_hms(2026, 3, 22, 12, 0, 0).unwrap();
        assert_eq!(format_timestamp(at), "March 22nd 2026, 12:00:00 pm UTC");
    }

    #[test]
    fn test_ordinal_suffix_teens() {
        assert_eq!(ordinal_suffix(11), "th");
        assert_eq!(ordinal_suffix(12), "th");
        assert_eq!(ordinal_suffix(13), "th");
        assert_eq!(ordinal_suffix(23), "rd");
    }
}
