use crate::error::{ReportError, Result};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// Inclusive calendar-date range for filtering activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// Start date (inclusive)
    pub from: NaiveDate,
    /// End date (inclusive)
    pub to: NaiveDate,
}

impl DateRange {
    /// Create a range, failing eagerly on an inverted pair
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(ReportError::config(format!(
                "invalid date range: {} is after {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// Range covering the last N days up to today (UTC)
    pub fn last_days(days: u32) -> Self {
        let to = Utc::now().date_naive();
        let from = to - Duration::days(days as i64);
        Self { from, to }
    }

    /// Range covering a single day
    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            from: date,
            to: date,
        }
    }

    /// Parse a YYYY-MM-DD string into a date
    pub fn parse_date(s: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| ReportError::config(format!("invalid date '{}', expected YYYY-MM-DD", s)))
    }

    /// Check if a timestamp falls within this range
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        self.contains_date(ts.date_naive())
    }

    /// Check if a calendar date falls within this range
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    /// Start of the first day as a UTC timestamp
    pub fn start_utc(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.from.and_hms_opt(0, 0, 0).unwrap_or_default())
    }

    /// End of the last day as a UTC timestamp
    pub fn end_utc(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.to.and_hms_opt(23, 59, 59).unwrap_or_default())
    }

    /// Iterate every calendar day in the range, in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let from = self.from;
        let to = self.to;
        from.iter_days().take_while(move |d| *d <= to)
    }

    /// Number of calendar days covered
    pub fn len_days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.from, self.to)
    }
}
