//! Date inputs accepted by the query functions.
//!
//! Query bounds can be given as ISO strings, as dates, or as whole periods ([`Year`],
//! [`Month`]); every form resolves to an inclusive span.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Year(pub i32);

impl Display for Year {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// A calendar month: `Month(year, month)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Month(pub i32, pub u32);

impl Month {
    pub fn year(self) -> i32 {
        self.0
    }

    pub fn month(self) -> u32 {
        self.1
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0, self.1)
    }
}

/// Inclusive span of calendar days.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Inclusive span of UTC instants.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub(crate) fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?;
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    Some((first_of_next - Duration::days(1)).day())
}

// --- Calendar days ---

pub trait AnyDate {
    fn date_span(self) -> Option<DateSpan>;
}

impl AnyDate for NaiveDate {
    fn date_span(self) -> Option<DateSpan> {
        Some(DateSpan {
            start: self,
            end: self,
        })
    }
}

impl AnyDate for &str {
    fn date_span(self) -> Option<DateSpan> {
        NaiveDate::parse_from_str(self.trim(), "%Y-%m-%d")
            .ok()?
            .date_span()
    }
}

impl AnyDate for String {
    fn date_span(self) -> Option<DateSpan> {
        self.as_str().date_span()
    }
}

impl AnyDate for Year {
    fn date_span(self) -> Option<DateSpan> {
        Some(DateSpan {
            start: NaiveDate::from_ymd_opt(self.0, 1, 1)?,
            end: NaiveDate::from_ymd_opt(self.0, 12, 31)?,
        })
    }
}

impl AnyDate for Month {
    fn date_span(self) -> Option<DateSpan> {
        let (year, month) = (self.year(), self.month());
        Some(DateSpan {
            start: NaiveDate::from_ymd_opt(year, month, 1)?,
            end: NaiveDate::from_ymd_opt(year, month, days_in_month(year, month)?)?,
        })
    }
}

// --- Instants ---

pub trait AnyDateTime {
    fn time_span(self) -> Option<TimeSpan>;
}

impl AnyDateTime for DateTime<Utc> {
    fn time_span(self) -> Option<TimeSpan> {
        Some(TimeSpan {
            start: self,
            end: self,
        })
    }
}

impl AnyDateTime for DateTime<FixedOffset> {
    fn time_span(self) -> Option<TimeSpan> {
        self.with_timezone(&Utc).time_span()
    }
}

impl AnyDateTime for NaiveDateTime {
    fn time_span(self) -> Option<TimeSpan> {
        Utc.from_utc_datetime(&self).time_span()
    }
}

impl AnyDateTime for NaiveDate {
    fn time_span(self) -> Option<TimeSpan> {
        let start = Utc.from_utc_datetime(&self.and_hms_opt(0, 0, 0)?);
        let end = Utc.from_utc_datetime(&self.and_hms_opt(23, 59, 59)?);
        Some(TimeSpan { start, end })
    }
}

/// Accepts RFC 3339 (`2024-05-01T08:00:00-08:00`), `%Y-%m-%d %H:%M:%S` (read as UTC) and
/// plain `%Y-%m-%d` (the whole day).
impl AnyDateTime for &str {
    fn time_span(self) -> Option<TimeSpan> {
        let text = self.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return dt.time_span();
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
            return naive.time_span();
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?.time_span()
    }
}

impl AnyDateTime for String {
    fn time_span(self) -> Option<TimeSpan> {
        self.as_str().time_span()
    }
}
