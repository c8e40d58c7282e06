//! UT observing dates (`YYYYMMDD`).

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtDate(u32);

impl UtDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some(Self::from_naive(date))
    }

    fn from_naive(date: NaiveDate) -> Self {
        UtDate(date.year() as u32 * 10_000 + date.month() * 100 + date.day())
    }

    /// Current UT date.
    pub fn today() -> Self {
        Self::from_naive(Utc::now().date_naive())
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt((self.0 / 10_000) as i32, (self.0 / 100) % 100, self.0 % 100)
    }
}

impl FromStr for UtDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let date = NaiveDate::parse_from_str(s, "%Y%m%d")
            .map_err(|e| format!("invalid UT date {:?} (expected YYYYMMDD): {}", s, e))?;
        Ok(Self::from_naive(date))
    }
}

impl fmt::Display for UtDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08}", self.0)
    }
}
