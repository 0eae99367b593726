//! Acquisition time ranges.

use std::fmt;

use chrono::{Days, Months, NaiveDate};
use thiserror::Error;

/// Half-open acquisition window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Calendar duration added to a start date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Period {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl Period {
    pub fn new(years: u32, months: u32, days: u32) -> Self {
        Self {
            years,
            months,
            days,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0
    }
}

/// Error building a date range.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DateRangeError {
    /// Year, month and day do not form a calendar date.
    #[error("Invalid start date {year:04}-{month:02}-{day:02}")]
    InvalidStart { year: i32, month: u32, day: u32 },
    /// Adding the duration overflows the calendar.
    #[error("Duration overflows the calendar")]
    Overflow,
    /// The range contains no days.
    #[error("Duration must be at least one day")]
    Empty,
}

impl DateRange {
    /// Builds the window starting at the given date and spanning `period`.
    ///
    /// Years and months are applied first, clamping the day to the end of
    /// the resulting month (31 January plus one month is 28 or 29
    /// February), then days are added.
    pub fn from_start(
        year: i32,
        month: u32,
        day: u32,
        period: Period,
    ) -> Result<Self, DateRangeError> {
        let start = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(DateRangeError::InvalidStart { year, month, day })?;

        let total_months = period
            .years
            .checked_mul(12)
            .and_then(|m| m.checked_add(period.months))
            .ok_or(DateRangeError::Overflow)?;

        let end = start
            .checked_add_months(Months::new(total_months))
            .and_then(|d| d.checked_add_days(Days::new(u64::from(period.days))))
            .ok_or(DateRangeError::Overflow)?;

        if end <= start {
            return Err(DateRangeError::Empty);
        }

        Ok(Self { start, end })
    }

    /// Catalog datetime interval, e.g. `2023-01-01T00:00:00Z/2023-04-01T00:00:00Z`.
    pub fn to_stac_interval(&self) -> String {
        format!(
            "{}T00:00:00Z/{}T00:00:00Z",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }

    /// Number of days covered.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}
