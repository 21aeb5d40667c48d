/// Shared types used across the codebase

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Calendar-month key in strict `YYYY-MM` form.
///
/// Dimension snapshots are keyed by these; all month arithmetic (range
/// expansion, last-N windows) goes through this type so year boundaries roll
/// in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Current calendar month (UTC).
    pub fn current() -> Self {
        let now = Utc::now();
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn prev(self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    /// Inclusive ordered range from `start` to `end`. Empty when start > end.
    pub fn months_between(start: MonthKey, end: MonthKey) -> Vec<MonthKey> {
        let mut months = Vec::new();
        let mut cursor = start;
        while cursor <= end {
            months.push(cursor);
            cursor = cursor.next();
        }
        months
    }

    /// The `n` months ending at `anchor` (inclusive), oldest first.
    pub fn last_n_months(anchor: MonthKey, n: u32) -> Vec<MonthKey> {
        let mut months = Vec::with_capacity(n as usize);
        let mut cursor = anchor;
        for _ in 0..n {
            months.push(cursor);
            cursor = cursor.prev();
        }
        months.reverse();
        months
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Strict parse: exactly `YYYY-MM`, four digits, dash, two digits, month 01-12.
impl FromStr for MonthKey {
    type Err = MonthKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(MonthKeyError(s.to_string()));
        }
        if !bytes[..4].iter().all(u8::is_ascii_digit) || !bytes[5..].iter().all(u8::is_ascii_digit) {
            return Err(MonthKeyError(s.to_string()));
        }
        let year: i32 = s[..4].parse().map_err(|_| MonthKeyError(s.to_string()))?;
        let month: u32 = s[5..].parse().map_err(|_| MonthKeyError(s.to_string()))?;
        MonthKey::new(year, month).ok_or_else(|| MonthKeyError(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid month key: {0} (expected YYYY-MM)")]
pub struct MonthKeyError(pub String);

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
