//! The storage seam: scoped read access to the archive tables.

pub mod error;
pub mod layouts;
pub mod memory;
pub mod sqlite;

use crate::archive::error::ArchiveError;
use crate::tidy::cell::WideRow;
use async_trait::async_trait;
use log::warn;
use std::collections::BTreeSet;
use std::fmt;

/// The archive tables read by the query functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArchiveTable {
    Stations,
    DailyFlows,
    DailyLevels,
    SedDailyLoads,
    SedDailySuscon,
    AnnualStatistics,
}

impl ArchiveTable {
    pub fn name(&self) -> &'static str {
        match self {
            ArchiveTable::Stations => "STATIONS",
            ArchiveTable::DailyFlows => "DLY_FLOWS",
            ArchiveTable::DailyLevels => "DLY_LEVELS",
            ArchiveTable::SedDailyLoads => "SED_DLY_LOADS",
            ArchiveTable::SedDailySuscon => "SED_DLY_SUSCON",
            ArchiveTable::AnnualStatistics => "ANNUAL_STATISTICS",
        }
    }

    pub fn has_year_column(&self) -> bool {
        !matches!(self, ArchiveTable::Stations)
    }
}

impl fmt::Display for ArchiveTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Row restriction pushed down into a table scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    /// Only rows of these stations; `None` reads every station.
    pub stations: Option<BTreeSet<String>>,
    /// Inclusive `YEAR` bounds; ignored for tables without a `YEAR` column.
    pub years: Option<(i32, i32)>,
}

impl ScanFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_stations(stations: Option<BTreeSet<String>>) -> Self {
        Self {
            stations,
            years: None,
        }
    }

    pub fn with_years(mut self, years: Option<(i32, i32)>) -> Self {
        self.years = years;
        self
    }

    /// An explicit empty station set matches nothing.
    pub fn is_empty_selection(&self) -> bool {
        self.stations.as_ref().is_some_and(BTreeSet::is_empty)
    }

    pub fn matches(&self, table: ArchiveTable, row: &WideRow) -> bool {
        let station_ok = match &self.stations {
            Some(stations) => row
                .text(layouts::STATION_NUMBER)
                .is_some_and(|id| stations.contains(&id)),
            None => true,
        };
        let year_ok = match (self.years, table.has_year_column()) {
            (Some((start, end)), true) => row
                .int(layouts::YEAR)
                .is_some_and(|year| (start as i64..=end as i64).contains(&year)),
            _ => true,
        };
        station_ok && year_ok
    }
}

/// Something that can open connections to an archive.
#[async_trait]
pub trait ArchiveReader: Send + Sync {
    async fn open(&self) -> Result<Box<dyn ArchiveConnection>, ArchiveError>;
}

/// An open archive connection. Close it with [`release`] on every path.
#[async_trait]
pub trait ArchiveConnection: Send {
    async fn scan(
        &mut self,
        table: ArchiveTable,
        filter: &ScanFilter,
    ) -> Result<Vec<WideRow>, ArchiveError>;

    async fn close(self: Box<Self>) -> Result<(), ArchiveError>;
}

/// Closes a connection; a failure to close is logged, never returned.
pub async fn release(connection: Box<dyn ArchiveConnection>) {
    if let Err(e) = connection.close().await {
        warn!("Failed to close archive connection: {}", e);
    }
}
