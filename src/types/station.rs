//! Hydrometric stations and their metadata.

use serde::{Deserialize, Serialize};

/// Operational status of a station (`HYD_STATUS` / `SED_STATUS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationalStatus {
    Active,
    Discontinued,
}

impl OperationalStatus {
    pub fn from_code(code: &str) -> Option<OperationalStatus> {
        match code.trim() {
            "A" => Some(OperationalStatus::Active),
            "D" => Some(OperationalStatus::Discontinued),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            OperationalStatus::Active => "A",
            OperationalStatus::Discontinued => "D",
        }
    }
}

/// Which station directory a station was listed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    /// The historical archive.
    Archive,
    /// The realtime datamart station list.
    Realtime,
}

/// A single hydrometric station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Upper-case station identifier, e.g. `08MF005`.
    pub station_number: String,
    pub station_name: String,
    /// Two-letter province / territory / state code, e.g. `BC`.
    pub prov_terr_state_loc: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hyd_status: Option<OperationalStatus>,
    pub sed_status: Option<OperationalStatus>,
    /// Gross drainage area in km².
    pub drainage_area_gross: Option<f64>,
    /// Effective drainage area in km².
    pub drainage_area_effect: Option<f64>,
    /// Member of the reference hydrometric basin network.
    pub rhbn: bool,
    /// Has a realtime gauge.
    pub real_time: bool,
    pub network: Network,
    /// IANA-style UTC offset label from the realtime list, e.g. `UTC-08:00`.
    pub timezone: Option<String>,
}

impl Station {
    pub fn new(
        station_number: impl Into<String>,
        station_name: impl Into<String>,
        prov_terr_state_loc: impl Into<String>,
        network: Network,
    ) -> Self {
        Self {
            station_number: station_number.into().trim().to_ascii_uppercase(),
            station_name: station_name.into(),
            prov_terr_state_loc: prov_terr_state_loc.into().trim().to_ascii_uppercase(),
            latitude: None,
            longitude: None,
            hyd_status: None,
            sed_status: None,
            drainage_area_gross: None,
            drainage_area_effect: None,
            rhbn: false,
            real_time: network == Network::Realtime,
            network,
            timezone: None,
        }
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}
