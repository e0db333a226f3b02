use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::GraphError;

/// Release date of a component version, `yyyyMMdd`.
///
/// Stored as the packed integer so ordering is plain integer ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EffectiveTime(u32);

impl EffectiveTime {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.year() as u32 * 10_000 + date.month() * 100 + date.day())
    }

    pub fn date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt((self.0 / 10_000) as i32, (self.0 / 100) % 100, self.0 % 100)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Parse an RF2 effective-time column. Empty means "not yet published".
    pub fn parse_column(raw: &str) -> Result<Option<Self>, GraphError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some)
    }
}

impl FromStr for EffectiveTime {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| GraphError::MalformedIdentifier {
            id: s.to_string(),
            reason: format!("invalid effective time: {reason}"),
        };
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected yyyyMMdd"));
        }
        let packed: u32 = s.parse().map_err(|_| invalid("expected yyyyMMdd"))?;
        let candidate = Self(packed);
        candidate.date().ok_or_else(|| invalid("no such calendar date"))?;
        Ok(candidate)
    }
}

impl fmt::Display for EffectiveTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08}", self.0)
    }
}

impl TryFrom<String> for EffectiveTime {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EffectiveTime> for String {
    fn from(value: EffectiveTime) -> Self {
        value.to_string()
    }
}
