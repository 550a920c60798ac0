//! Calendar month selection.
//!
//! A [`TargetMonth`] is the inclusion window for a run: a source file belongs to
//! the run when its modification time falls in the same month and year.
//!
//! Modification times are converted to the host's local timezone and compared
//! as-is. Files touched near a month boundary on a machine with a different
//! timezone than the one that produced them may land in the neighbouring month;
//! this is a known limitation, not something the matcher tries to correct.

use chrono::{DateTime, Datelike, Local};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

/// The (month, year) pair selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TargetMonth {
    month: u32,
    year: i32,
}

impl TargetMonth {
    pub fn new(month: u32, year: i32) -> Result<Self, MonthParseError> {
        if !(1..=12).contains(&month) {
            return Err(MonthParseError::MonthOutOfRange(month));
        }
        Ok(Self { month, year })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// True iff `mtime`, read in local time, has this month and year.
    pub fn matches(&self, mtime: SystemTime) -> bool {
        let local: DateTime<Local> = mtime.into();
        local.month() == self.month && local.year() == self.year
    }
}

impl fmt::Display for TargetMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}

/// Parses `MM/YYYY`: two-digit month, four-digit year.
impl FromStr for TargetMonth {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (month_raw, year_raw) = raw
            .split_once('/')
            .ok_or_else(|| MonthParseError::Format(raw.to_string()))?;

        let well_formed = month_raw.len() == 2
            && year_raw.len() == 4
            && month_raw.chars().all(|c| c.is_ascii_digit())
            && year_raw.chars().all(|c| c.is_ascii_digit());
        if !well_formed {
            return Err(MonthParseError::Format(raw.to_string()));
        }

        let month = month_raw
            .parse::<u32>()
            .map_err(|_| MonthParseError::Format(raw.to_string()))?;
        let year = year_raw
            .parse::<i32>()
            .map_err(|_| MonthParseError::Format(raw.to_string()))?;
        TargetMonth::new(month, year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonthParseError {
    #[error(
        "invalid date format '{0}': use MM/YYYY, with two digits for the month and four for the year"
    )]
    Format(String),
    #[error("month {0} is out of range, expected 01 to 12")]
    MonthOutOfRange(u32),
}
