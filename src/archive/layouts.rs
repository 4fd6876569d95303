//! Column layouts of the archive tables and their conversion into typed tidy rows.

use crate::archive::ArchiveTable;
use crate::stations::directory::StationDirectory;
use crate::tidy::cell::WideRow;
use crate::tidy::column_spec::{ColumnSpec, Subfield};
use crate::tidy::occurrence::occurrence_date;
use crate::tidy::reshape::{reshape, LongRow};
use crate::types::observation::{AnnualStatistic, DailyObservation, MonthlyObservation, SummaryStat};
use crate::types::parameter::Parameter;
use crate::types::station::{Network, OperationalStatus, Station};
use log::debug;

pub const STATION_NUMBER: &str = "STATION_NUMBER";
pub const YEAR: &str = "YEAR";
pub const MONTH: &str = "MONTH";

const DAILY_IDS: [&str; 3] = [STATION_NUMBER, YEAR, MONTH];
const MONTHLY_IDS: [&str; 5] = [STATION_NUMBER, YEAR, MONTH, "FULL_MONTH", "NO_DAYS"];
const ANNUAL_IDS: [&str; 3] = [STATION_NUMBER, "DATA_TYPE", YEAR];

const ANNUAL_COLUMNS: [&str; 9] = [
    "MEAN",
    "MIN_MONTH",
    "MIN_DAY",
    "MIN",
    "MIN_SYMBOL",
    "MAX_MONTH",
    "MAX_DAY",
    "MAX",
    "MAX_SYMBOL",
];

/// The parameter and day-column layout of a daily table; `None` for the other tables.
pub fn daily_layout(table: ArchiveTable) -> Option<(Parameter, ColumnSpec)> {
    let with_symbol = [Subfield::Value, Subfield::Symbol];
    let (parameter, subfields): (Parameter, &[Subfield]) = match table {
        ArchiveTable::DailyFlows => (Parameter::Flow, &with_symbol),
        ArchiveTable::DailyLevels => (Parameter::Level, &with_symbol),
        ArchiveTable::SedDailyLoads => (Parameter::Load, &[Subfield::Value]),
        ArchiveTable::SedDailySuscon => (Parameter::Suscon, &with_symbol),
        _ => return None,
    };
    Some((parameter, ColumnSpec::day_columns(parameter.code(), subfields)))
}

/// The summary columns of `DLY_FLOWS` / `DLY_LEVELS`. Levels have no monthly total, so that
/// quantity simply never appears for them.
pub fn monthly_layout() -> ColumnSpec {
    ColumnSpec::new()
        .with("MEAN", Subfield::Value, "MONTHLY_MEAN")
        .with("TOTAL", Subfield::Value, "MONTHLY_TOTAL")
        .with("MIN", Subfield::Day, "FIRST_DAY_MIN")
        .with("MIN", Subfield::Value, "MIN")
        .with("MAX", Subfield::Day, "FIRST_DAY_MAX")
        .with("MAX", Subfield::Value, "MAX")
}

pub fn annual_layout() -> ColumnSpec {
    ColumnSpec::from_column_names(ANNUAL_COLUMNS, &ANNUAL_IDS)
}

fn station_of(row: &LongRow) -> Option<String> {
    row.id(STATION_NUMBER).as_text()
}

/// One row per station-day. Days that do not exist in the month (the 30th of February)
/// are dropped; missing values on real days are kept.
pub fn daily_observations(table: ArchiveTable, rows: &[WideRow]) -> Vec<DailyObservation> {
    let Some((parameter, spec)) = daily_layout(table) else {
        return Vec::new();
    };
    reshape(rows, &DAILY_IDS, &spec)
        .into_iter()
        .filter_map(|row| {
            let date = occurrence_date(
                row.id(YEAR).as_i64(),
                row.id(MONTH).as_i64(),
                row.quantity.parse::<i64>().ok(),
            )?;
            Some(DailyObservation {
                station_number: station_of(&row)?,
                date,
                parameter,
                value: row.value(),
                symbol: row.symbol(),
            })
        })
        .collect()
}

pub fn monthly_observations(parameter: Parameter, rows: &[WideRow]) -> Vec<MonthlyObservation> {
    reshape(rows, &MONTHLY_IDS, &monthly_layout())
        .into_iter()
        .filter_map(|row| {
            let year = row.id(YEAR).as_i64().and_then(|y| i32::try_from(y).ok())?;
            let month = row.id(MONTH).as_i64().and_then(|m| u32::try_from(m).ok())?;
            Some(MonthlyObservation {
                station_number: station_of(&row)?,
                parameter,
                year,
                month,
                full_month: row.id("FULL_MONTH").as_bool(),
                no_days: row.id("NO_DAYS").as_i64(),
                sum_stat: SummaryStat::from_code(&row.quantity)?,
                value: row.value(),
                date_occurred: occurrence_date(
                    Some(year as i64),
                    Some(month as i64),
                    row.field(Subfield::Day).as_i64(),
                ),
            })
        })
        .collect()
}

/// Rows with an unknown `DATA_TYPE` are skipped.
pub fn annual_statistics(rows: &[WideRow]) -> Vec<AnnualStatistic> {
    reshape(rows, &ANNUAL_IDS, &annual_layout())
        .into_iter()
        .filter_map(|row| {
            let data_type = row.id("DATA_TYPE").as_text()?;
            let Some(parameter) = Parameter::from_data_type(&data_type) else {
                debug!("Skipping annual statistic with data type {}", data_type);
                return None;
            };
            let year = row.id(YEAR).as_i64().and_then(|y| i32::try_from(y).ok())?;
            Some(AnnualStatistic {
                station_number: station_of(&row)?,
                parameter,
                year,
                sum_stat: SummaryStat::from_code(&row.quantity)?,
                value: row.value(),
                date: occurrence_date(
                    Some(year as i64),
                    row.field(Subfield::Month).as_i64(),
                    row.field(Subfield::Day).as_i64(),
                ),
                symbol: row.symbol(),
            })
        })
        .collect()
}

/// Builds the archive station directory from `STATIONS` rows.
pub fn station_directory(rows: &[WideRow]) -> StationDirectory {
    StationDirectory::new(rows.iter().filter_map(|row| {
        let mut station = Station::new(
            row.text(STATION_NUMBER)?,
            row.text("STATION_NAME").unwrap_or_default(),
            row.text("PROV_TERR_STATE_LOC").unwrap_or_default(),
            Network::Archive,
        );
        station.latitude = row.float("LATITUDE");
        station.longitude = row.float("LONGITUDE");
        station.hyd_status = row
            .text("HYD_STATUS")
            .and_then(|code| OperationalStatus::from_code(&code));
        station.sed_status = row
            .text("SED_STATUS")
            .and_then(|code| OperationalStatus::from_code(&code));
        station.drainage_area_gross = row.float("DRAINAGE_AREA_GROSS");
        station.drainage_area_effect = row.float("DRAINAGE_AREA_EFFECT");
        station.rhbn = row.cell("RHBN").as_bool().unwrap_or(false);
        station.real_time = row.cell("REAL_TIME").as_bool().unwrap_or(false);
        Some(station)
    }))
}
