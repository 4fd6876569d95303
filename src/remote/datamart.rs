//! Client for the realtime datamart: the station list and per-station CSV series.

use crate::remote::csv::{frame_to_rows, read_positional_csv};
use crate::remote::error::RemoteError;
use crate::remote::transport::Transport;
use crate::tidy::cell::WideRow;
use crate::tidy::column_spec::ColumnSpec;
use crate::tidy::reshape::reshape;
use crate::types::dates::AnyDateTime;
use crate::types::observation::RealtimeObservation;
use crate::types::parameter::Parameter;
use crate::types::station::{Network, OperationalStatus, Station};
use log::{debug, info};
use std::fmt;
use std::sync::Arc;

pub const DATAMART_COLUMNS: [&str; 10] = [
    "STATION_NUMBER",
    "Date",
    "LEVEL",
    "LEVEL_GRADE",
    "LEVEL_SYMBOL",
    "LEVEL_CODE",
    "FLOW",
    "FLOW_GRADE",
    "FLOW_SYMBOL",
    "FLOW_CODE",
];

pub const STATION_LIST_COLUMNS: [&str; 6] = [
    "STATION_NUMBER",
    "STATION_NAME",
    "LATITUDE",
    "LONGITUDE",
    "PROV_TERR_STATE_LOC",
    "TIMEZONE",
];

const SERIES_IDS: [&str; 2] = ["STATION_NUMBER", "Date"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Five-minute readings of the last 30 days.
    Hourly,
    /// Daily means of the last 30 days.
    Daily,
}

impl Resolution {
    pub fn path_segment(&self) -> &'static str {
        match self {
            Resolution::Hourly => "hourly",
            Resolution::Daily => "daily",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

#[derive(Clone)]
pub struct DatamartClient {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl DatamartClient {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn station_list_url(&self) -> String {
        format!("{}/doc/hydrometric_StationList.csv", self.base_url)
    }

    pub fn station_file_url(&self, prov: &str, station_number: &str, resolution: Resolution) -> String {
        format!(
            "{base}/{prov}/{res}/{prov}_{stn}_{res}_hydrometric.csv",
            base = self.base_url,
            prov = prov,
            res = resolution.path_segment(),
            stn = station_number,
        )
    }

    /// The realtime station directory. Every listed station is active.
    pub async fn fetch_station_list(&self) -> Result<Vec<Station>, RemoteError> {
        let url = self.station_list_url();
        let rows = self.fetch_rows(&url, &STATION_LIST_COLUMNS).await?;
        let stations: Vec<Station> = rows.iter().filter_map(realtime_station).collect();
        info!("Fetched {} realtime stations from {}", stations.len(), url);
        Ok(stations)
    }

    pub async fn fetch_series(
        &self,
        station: &Station,
        resolution: Resolution,
    ) -> Result<Vec<RealtimeObservation>, RemoteError> {
        let url = self.station_file_url(
            &station.prov_terr_state_loc,
            &station.station_number,
            resolution,
        );
        let rows = self.fetch_rows(&url, &DATAMART_COLUMNS).await?;
        let observations = realtime_observations(&rows, &station.prov_terr_state_loc);
        debug!(
            "{} {} observations for {}",
            observations.len(),
            resolution,
            station.station_number
        );
        Ok(observations)
    }

    async fn fetch_rows(
        &self,
        url: &str,
        schema: &'static [&'static str],
    ) -> Result<Vec<WideRow>, RemoteError> {
        let bytes = self.transport.get(url).await?;
        let df = read_positional_csv(bytes, url, schema).await?;
        frame_to_rows(&df).map_err(|source| RemoteError::CsvRead {
            url: url.to_string(),
            source,
        })
    }
}

fn realtime_station(row: &WideRow) -> Option<Station> {
    let mut station = Station::new(
        row.text("STATION_NUMBER")?,
        row.text("STATION_NAME").unwrap_or_default(),
        row.text("PROV_TERR_STATE_LOC").unwrap_or_default(),
        Network::Realtime,
    );
    station.latitude = row.float("LATITUDE");
    station.longitude = row.float("LONGITUDE");
    station.hyd_status = Some(OperationalStatus::Active);
    station.timezone = row.text("TIMEZONE");
    Some(station)
}

/// Splits each datamart row into one observation per parameter. Rows whose timestamp
/// cannot be read are dropped.
pub fn realtime_observations(rows: &[WideRow], prov: &str) -> Vec<RealtimeObservation> {
    let spec = ColumnSpec::from_column_names(DATAMART_COLUMNS, &SERIES_IDS);
    reshape(rows, &SERIES_IDS, &spec)
        .into_iter()
        .filter_map(|row| {
            let parameter = Parameter::from_code(&row.quantity)?;
            let date = row.id("Date").as_text()?.time_span()?.start.naive_utc();
            Some(RealtimeObservation {
                station_number: row.id("STATION_NUMBER").as_text()?,
                prov_terr_state_loc: prov.to_string(),
                date,
                parameter,
                value: row.value(),
                grade: row.grade(),
                symbol: row.symbol(),
                code: row.code(),
            })
        })
        .collect()
}
