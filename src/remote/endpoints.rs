/// Base URLs of the remote feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Root of the hydrometric datamart tree.
    pub datamart: String,
    pub web_service: String,
    pub auth: String,
}

pub const DEFAULT_DATAMART_URL: &str = "https://dd.weather.gc.ca/hydrometric";
pub const DEFAULT_WEB_SERVICE_URL: &str =
    "https://wateroffice.ec.gc.ca/services/real_time_data/csv/inline";
pub const DEFAULT_AUTH_URL: &str = "https://wateroffice.ec.gc.ca/services/auth";

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            datamart: DEFAULT_DATAMART_URL.to_string(),
            web_service: DEFAULT_WEB_SERVICE_URL.to_string(),
            auth: DEFAULT_AUTH_URL.to_string(),
        }
    }
}
