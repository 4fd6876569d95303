//! Validated query filters. Everything here runs before any I/O.

use crate::error::HydatError;
use crate::stations::resolver::{check_sentinel, normalize_ids};
use crate::types::dates::{AnyDate, Month, Year};
use chrono::{Datelike, NaiveDate};

/// Optional inclusive bounds on observation dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    /// Parses `YYYY-MM-DD` bounds. Malformed input or `start > end` is an
    /// [`HydatError::InvalidArgument`].
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, HydatError> {
        let start = start
            .map(|text| {
                text.date_span().map(|span| span.start).ok_or_else(|| {
                    HydatError::invalid(format!(
                        "start_date '{}' is not a valid date (expected YYYY-MM-DD)",
                        text
                    ))
                })
            })
            .transpose()?;
        let end = end
            .map(|text| {
                text.date_span().map(|span| span.end).ok_or_else(|| {
                    HydatError::invalid(format!(
                        "end_date '{}' is not a valid date (expected YYYY-MM-DD)",
                        text
                    ))
                })
            })
            .transpose()?;
        Self::checked(start, end)
    }

    /// A window from the start of `start` to the end of `end`, e.g.
    /// `DateWindow::between(Year(1990), Month(1999, 6))`.
    pub fn between(start: impl AnyDate, end: impl AnyDate) -> Result<Self, HydatError> {
        let start = start
            .date_span()
            .ok_or_else(|| HydatError::invalid("start period does not resolve to a date"))?;
        let end = end
            .date_span()
            .ok_or_else(|| HydatError::invalid("end period does not resolve to a date"))?;
        Self::checked(Some(start.start), Some(end.end))
    }

    fn checked(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, HydatError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(HydatError::invalid(format!(
                    "start_date {} is after end_date {}",
                    start, end
                )));
            }
        }
        Ok(Self { start, end })
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }

    /// Whether any day of the month falls inside the window.
    pub fn overlaps_month(&self, year: i32, month: u32) -> bool {
        match Month(year, month).date_span() {
            Some(span) => self.overlaps(span.start, span.end),
            None => false,
        }
    }

    pub fn overlaps_year(&self, year: i32) -> bool {
        match Year(year).date_span() {
            Some(span) => self.overlaps(span.start, span.end),
            None => false,
        }
    }

    fn overlaps(&self, first: NaiveDate, last: NaiveDate) -> bool {
        self.start.map_or(true, |start| last >= start) && self.end.map_or(true, |end| first <= end)
    }

    /// Year bounds for pushing the window down into an archive scan.
    pub fn years(&self) -> Option<(i32, i32)> {
        if self.is_unbounded() {
            return None;
        }
        Some((
            self.start.map_or(i32::MIN, |start| start.year()),
            self.end.map_or(i32::MAX, |end| end.year()),
        ))
    }
}

/// The common filter of the archive and datamart queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    /// Normalised explicit station identifiers, `None` when not given.
    pub station_number: Option<Vec<String>>,
    /// Normalised jurisdiction codes, `None` when not given.
    pub prov_terr_state_loc: Option<Vec<String>>,
    pub dates: DateWindow,
}

impl QueryFilter {
    pub fn new(
        station_number: Option<&[&str]>,
        prov_terr_state_loc: Option<&[&str]>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Self, HydatError> {
        let station_number = station_number.map(|ids| normalize_ids(ids.iter().copied()));
        if let Some(ids) = &station_number {
            check_sentinel(ids)?;
        }
        let prov_terr_state_loc = prov_terr_state_loc.map(|codes| normalize_ids(codes.iter().copied()));
        let dates = DateWindow::parse(start_date, end_date)?;

        Ok(Self {
            station_number,
            prov_terr_state_loc,
            dates,
        })
    }

    /// Exactly one explicit station: such queries fail with `NotFound` instead of
    /// reporting an empty result.
    pub fn is_single_station(&self) -> bool {
        self.station_number.as_ref().is_some_and(|ids| ids.len() == 1)
    }

    /// No station or jurisdiction restriction.
    pub fn selects_everything(&self) -> bool {
        self.station_number.is_none() && self.prov_terr_state_loc.is_none()
    }

    pub fn describe(&self) -> String {
        match (&self.station_number, &self.prov_terr_state_loc) {
            (Some(ids), _) => format!("station(s) {}", ids.join(", ")),
            (None, Some(codes)) => format!("jurisdiction(s) {}", codes.join(", ")),
            (None, None) => "all stations".to_string(),
        }
    }
}
