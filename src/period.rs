//! Report periods and the clock used to resolve relative ranges.

use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

use crate::error::{ReportError, ReportResult};

/// Date format used by the Metrika API for `date1`/`date2`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of "today" for relative periods
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock, normalized to UTC
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock pinned to a single date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Closed date interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ReportResult<Self> {
        if start > end {
            return Err(ReportError::InvalidRequest(format!(
                "period start {} is after end {}",
                start.format(DATE_FORMAT),
                end.format(DATE_FORMAT)
            )));
        }

        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// `date1` query value
    pub fn date1(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    /// `date2` query value
    pub fn date2(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.date1(), self.date2())
    }
}

/// Period ending today and starting `days` days earlier.
pub fn days_ago(clock: &dyn Clock, days: i64) -> ReportResult<Period> {
    if days < 0 {
        return Err(ReportError::InvalidRequest(format!(
            "day count must not be negative, got {days}"
        )));
    }

    let end = clock.today();
    let start = end
        .checked_sub_days(Days::new(days as u64))
        .ok_or_else(|| ReportError::InvalidRequest(format!("{days} days is out of range")))?;

    Ok(Period { start, end })
}
