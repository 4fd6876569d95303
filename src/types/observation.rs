//! Typed tidy rows produced by the reshape pipelines, and their conversion to polars frames.

use crate::tidy::merge::SeriesPoint;
use crate::types::parameter::Parameter;
use crate::types::station::Station;
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::cmp::Ordering;
use std::fmt;

/// Rows that can be materialised as a polars `DataFrame` with a fixed column layout.
pub trait IntoFrame: Sized {
    fn into_frame(rows: &[Self]) -> PolarsResult<DataFrame>;
}

/// Summary statistic of a monthly or annual row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SummaryStat {
    Mean,
    Total,
    Min,
    Max,
}

impl SummaryStat {
    pub fn code(&self) -> &'static str {
        match self {
            SummaryStat::Mean => "MEAN",
            SummaryStat::Total => "TOTAL",
            SummaryStat::Min => "MIN",
            SummaryStat::Max => "MAX",
        }
    }

    pub fn from_code(code: &str) -> Option<SummaryStat> {
        match code {
            "MEAN" => Some(SummaryStat::Mean),
            "TOTAL" => Some(SummaryStat::Total),
            "MIN" => Some(SummaryStat::Min),
            "MAX" => Some(SummaryStat::Max),
            _ => None,
        }
    }
}

impl fmt::Display for SummaryStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyObservation {
    pub station_number: String,
    pub date: NaiveDate,
    pub parameter: Parameter,
    pub value: Option<f64>,
    pub symbol: Option<String>,
}

impl DailyObservation {
    pub fn tidy_order(a: &Self, b: &Self) -> Ordering {
        (a.parameter, &a.station_number, a.date).cmp(&(b.parameter, &b.station_number, b.date))
    }
}

impl IntoFrame for DailyObservation {
    fn into_frame(rows: &[Self]) -> PolarsResult<DataFrame> {
        df!(
            "STATION_NUMBER" => rows.iter().map(|r| r.station_number.as_str()).collect::<Vec<_>>(),
            "Date" => rows.iter().map(|r| r.date).collect::<Vec<_>>(),
            "Parameter" => rows.iter().map(|r| r.parameter.code()).collect::<Vec<_>>(),
            "Value" => rows.iter().map(|r| r.value).collect::<Vec<_>>(),
            "Symbol" => rows.iter().map(|r| r.symbol.clone()).collect::<Vec<_>>(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyObservation {
    pub station_number: String,
    pub parameter: Parameter,
    pub year: i32,
    pub month: u32,
    pub full_month: Option<bool>,
    pub no_days: Option<i64>,
    pub sum_stat: SummaryStat,
    pub value: Option<f64>,
    /// Day of the extreme for MIN/MAX, `None` for MEAN/TOTAL.
    pub date_occurred: Option<NaiveDate>,
}

impl MonthlyObservation {
    pub fn tidy_order(a: &Self, b: &Self) -> Ordering {
        (a.parameter, &a.station_number, a.year, a.month, a.sum_stat).cmp(&(
            b.parameter,
            &b.station_number,
            b.year,
            b.month,
            b.sum_stat,
        ))
    }
}

impl IntoFrame for MonthlyObservation {
    fn into_frame(rows: &[Self]) -> PolarsResult<DataFrame> {
        df!(
            "STATION_NUMBER" => rows.iter().map(|r| r.station_number.as_str()).collect::<Vec<_>>(),
            "Year" => rows.iter().map(|r| r.year).collect::<Vec<_>>(),
            "Month" => rows.iter().map(|r| r.month as i32).collect::<Vec<_>>(),
            "Full_Month" => rows.iter().map(|r| r.full_month).collect::<Vec<_>>(),
            "No_days" => rows.iter().map(|r| r.no_days).collect::<Vec<_>>(),
            "Sum_stat" => rows.iter().map(|r| r.sum_stat.code()).collect::<Vec<_>>(),
            "Value" => rows.iter().map(|r| r.value).collect::<Vec<_>>(),
            "Date_occurred" => rows.iter().map(|r| r.date_occurred).collect::<Vec<_>>(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnualStatistic {
    pub station_number: String,
    pub parameter: Parameter,
    pub year: i32,
    pub sum_stat: SummaryStat,
    pub value: Option<f64>,
    pub date: Option<NaiveDate>,
    pub symbol: Option<String>,
}

impl AnnualStatistic {
    pub fn tidy_order(a: &Self, b: &Self) -> Ordering {
        (a.parameter, &a.station_number, a.year, a.sum_stat).cmp(&(
            b.parameter,
            &b.station_number,
            b.year,
            b.sum_stat,
        ))
    }
}

impl IntoFrame for AnnualStatistic {
    fn into_frame(rows: &[Self]) -> PolarsResult<DataFrame> {
        df!(
            "STATION_NUMBER" => rows.iter().map(|r| r.station_number.as_str()).collect::<Vec<_>>(),
            "Parameter" => rows.iter().map(|r| r.parameter.code()).collect::<Vec<_>>(),
            "Year" => rows.iter().map(|r| r.year).collect::<Vec<_>>(),
            "Sum_stat" => rows.iter().map(|r| r.sum_stat.code()).collect::<Vec<_>>(),
            "Value" => rows.iter().map(|r| r.value).collect::<Vec<_>>(),
            "Date" => rows.iter().map(|r| r.date).collect::<Vec<_>>(),
            "Symbol" => rows.iter().map(|r| r.symbol.clone()).collect::<Vec<_>>(),
        )
    }
}

/// One datamart observation. `date` is UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeObservation {
    pub station_number: String,
    pub prov_terr_state_loc: String,
    pub date: NaiveDateTime,
    pub parameter: Parameter,
    pub value: Option<f64>,
    pub grade: Option<String>,
    pub symbol: Option<String>,
    pub code: Option<String>,
}

impl RealtimeObservation {
    pub fn tidy_order(a: &Self, b: &Self) -> Ordering {
        (a.parameter, &a.station_number, a.date).cmp(&(b.parameter, &b.station_number, b.date))
    }
}

impl SeriesPoint for RealtimeObservation {
    fn timestamp(&self) -> NaiveDateTime {
        self.date
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

impl IntoFrame for RealtimeObservation {
    fn into_frame(rows: &[Self]) -> PolarsResult<DataFrame> {
        df!(
            "STATION_NUMBER" => rows.iter().map(|r| r.station_number.as_str()).collect::<Vec<_>>(),
            "PROV_TERR_STATE_LOC" => rows.iter().map(|r| r.prov_terr_state_loc.as_str()).collect::<Vec<_>>(),
            "Date" => rows.iter().map(|r| r.date).collect::<Vec<_>>(),
            "Parameter" => rows.iter().map(|r| r.parameter.code()).collect::<Vec<_>>(),
            "Value" => rows.iter().map(|r| r.value).collect::<Vec<_>>(),
            "Grade" => rows.iter().map(|r| r.grade.clone()).collect::<Vec<_>>(),
            "Symbol" => rows.iter().map(|r| r.symbol.clone()).collect::<Vec<_>>(),
            "Code" => rows.iter().map(|r| r.code.clone()).collect::<Vec<_>>(),
        )
    }
}

/// One web-service observation joined with the parameter catalog. `date` is UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct WebServiceObservation {
    pub station_number: String,
    pub date: NaiveDateTime,
    pub parameter: i32,
    pub name_en: Option<String>,
    pub unit: Option<String>,
    pub code: Option<String>,
    pub value: Option<f64>,
    pub grade: Option<String>,
    pub symbol: Option<String>,
    pub approval: Option<String>,
}

impl WebServiceObservation {
    pub fn tidy_order(a: &Self, b: &Self) -> Ordering {
        (a.parameter, &a.station_number, a.date).cmp(&(b.parameter, &b.station_number, b.date))
    }
}

impl IntoFrame for WebServiceObservation {
    fn into_frame(rows: &[Self]) -> PolarsResult<DataFrame> {
        df!(
            "STATION_NUMBER" => rows.iter().map(|r| r.station_number.as_str()).collect::<Vec<_>>(),
            "Date" => rows.iter().map(|r| r.date).collect::<Vec<_>>(),
            "Name_En" => rows.iter().map(|r| r.name_en.clone()).collect::<Vec<_>>(),
            "Value" => rows.iter().map(|r| r.value).collect::<Vec<_>>(),
            "Unit" => rows.iter().map(|r| r.unit.clone()).collect::<Vec<_>>(),
            "Grade" => rows.iter().map(|r| r.grade.clone()).collect::<Vec<_>>(),
            "Symbol" => rows.iter().map(|r| r.symbol.clone()).collect::<Vec<_>>(),
            "Approval" => rows.iter().map(|r| r.approval.clone()).collect::<Vec<_>>(),
            "Parameter" => rows.iter().map(|r| r.parameter).collect::<Vec<_>>(),
            "Code" => rows.iter().map(|r| r.code.clone()).collect::<Vec<_>>(),
        )
    }
}

impl IntoFrame for Station {
    fn into_frame(rows: &[Self]) -> PolarsResult<DataFrame> {
        df!(
            "STATION_NUMBER" => rows.iter().map(|s| s.station_number.as_str()).collect::<Vec<_>>(),
            "STATION_NAME" => rows.iter().map(|s| s.station_name.as_str()).collect::<Vec<_>>(),
            "PROV_TERR_STATE_LOC" => rows.iter().map(|s| s.prov_terr_state_loc.as_str()).collect::<Vec<_>>(),
            "HYD_STATUS" => rows.iter().map(|s| s.hyd_status.map(|st| st.code())).collect::<Vec<_>>(),
            "SED_STATUS" => rows.iter().map(|s| s.sed_status.map(|st| st.code())).collect::<Vec<_>>(),
            "LATITUDE" => rows.iter().map(|s| s.latitude).collect::<Vec<_>>(),
            "LONGITUDE" => rows.iter().map(|s| s.longitude).collect::<Vec<_>>(),
            "DRAINAGE_AREA_GROSS" => rows.iter().map(|s| s.drainage_area_gross).collect::<Vec<_>>(),
            "DRAINAGE_AREA_EFFECT" => rows.iter().map(|s| s.drainage_area_effect).collect::<Vec<_>>(),
            "RHBN" => rows.iter().map(|s| s.rhbn).collect::<Vec<_>>(),
            "REAL_TIME" => rows.iter().map(|s| s.real_time).collect::<Vec<_>>(),
            "TIMEZONE" => rows.iter().map(|s| s.timezone.clone()).collect::<Vec<_>>(),
        )
    }
}
