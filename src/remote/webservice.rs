//! Client for the authenticated realtime web service.

use crate::remote::csv::{frame_to_rows, read_positional_csv};
use crate::remote::error::RemoteError;
use crate::remote::transport::Transport;
use crate::tidy::cell::WideRow;
use crate::types::dates::{AnyDateTime, TimeSpan};
use crate::types::observation::WebServiceObservation;
use crate::types::parameter::catalog_entry;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use reqwest::{StatusCode, Url};
use std::env;
use std::fmt;
use std::sync::Arc;

pub const TOKEN_LIFETIME_MINUTES: i64 = 10;
pub const MAX_STATIONS_PER_REQUEST: usize = 300;
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

pub const USERNAME_ENV: &str = "WS_USRNM";
pub const PASSWORD_ENV: &str = "WS_PWD";

pub const WEB_SERVICE_COLUMNS: [&str; 9] = [
    "STATION_NUMBER",
    "Date",
    "Parameter",
    "Value",
    "Qualifier",
    "Symbol",
    "Approval",
    "Grade",
    "Qualifiers",
];

const REQUEST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, PartialEq, Eq)]
pub struct WebServiceCredentials {
    pub username: String,
    pub password: String,
}

impl WebServiceCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reads `WS_USRNM` and `WS_PWD`.
    pub fn from_env() -> Result<Self, RemoteError> {
        let username = env::var(USERNAME_ENV).map_err(|_| RemoteError::MissingCredentials(USERNAME_ENV))?;
        let password = env::var(PASSWORD_ENV).map_err(|_| RemoteError::MissingCredentials(PASSWORD_ENV))?;
        Ok(Self::new(username, password))
    }
}

impl fmt::Debug for WebServiceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebServiceCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A web-service token. Valid for ten minutes after issue. The service keeps at most five
/// tokens alive per account, so reuse one across requests instead of issuing per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    issued_at: DateTime<Utc>,
}

impl Token {
    pub fn new(value: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            issued_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::minutes(TOKEN_LIFETIME_MINUTES)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// The default request window: the last 30 days up to now.
pub fn default_window(now: DateTime<Utc>) -> TimeSpan {
    TimeSpan {
        start: now - Duration::days(DEFAULT_WINDOW_DAYS),
        end: now,
    }
}

#[derive(Clone)]
pub struct WebServiceClient {
    transport: Arc<dyn Transport>,
    data_url: String,
    auth_url: String,
}

impl WebServiceClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        data_url: impl Into<String>,
        auth_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            data_url: data_url.into(),
            auth_url: auth_url.into(),
        }
    }

    pub async fn issue_token(&self, credentials: &WebServiceCredentials) -> Result<Token, RemoteError> {
        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];
        let body = match self.transport.post_form(&self.auth_url, &form).await {
            Ok(body) => body,
            Err(RemoteError::HttpStatus { url, status })
                if is_rejection(status) || status == StatusCode::UNPROCESSABLE_ENTITY =>
            {
                warn!("Web service rejected the credentials of {}", credentials.username);
                return Err(RemoteError::Unauthorized { url });
            }
            Err(e) => return Err(e),
        };
        let value = String::from_utf8(body)
            .map_err(|source| RemoteError::Encoding {
                url: self.auth_url.clone(),
                source,
            })?
            .trim()
            .to_string();
        if value.is_empty() {
            return Err(RemoteError::Unauthorized {
                url: self.auth_url.clone(),
            });
        }
        info!("Issued web service token for {}", credentials.username);
        Ok(Token::new(value, Utc::now()))
    }

    pub fn request_url(
        &self,
        stations: &[String],
        parameters: &[i32],
        span: TimeSpan,
        token: &Token,
    ) -> Result<String, RemoteError> {
        let mut url = Url::parse(&self.data_url).map_err(|e| RemoteError::NotAvailable {
            url: self.data_url.clone(),
            reason: e.to_string(),
        })?;
        {
            let mut query = url.query_pairs_mut();
            for station in stations {
                query.append_pair("stations[]", station);
            }
            for parameter in parameters {
                query.append_pair("parameters[]", &parameter.to_string());
            }
            query
                .append_pair("start_date", &span.start.format(REQUEST_TIME_FORMAT).to_string())
                .append_pair("end_date", &span.end.format(REQUEST_TIME_FORMAT).to_string())
                .append_pair("token", token.value());
        }
        Ok(url.to_string())
    }

    /// Observations for up to [`MAX_STATIONS_PER_REQUEST`] stations, joined with the
    /// parameter catalog. Expired tokens are refused without a request.
    pub async fn fetch(
        &self,
        stations: &[String],
        parameters: &[i32],
        span: TimeSpan,
        token: &Token,
    ) -> Result<Vec<WebServiceObservation>, RemoteError> {
        if token.is_expired() {
            return Err(RemoteError::TokenExpired {
                expired_at: token.expires_at(),
            });
        }
        let url = self.request_url(stations, parameters, span, token)?;
        debug!("Requesting {} stations from the web service", stations.len());
        let bytes = match self.transport.get(&url).await {
            Ok(bytes) => bytes,
            Err(RemoteError::HttpStatus { status, .. }) if is_rejection(status) => {
                warn!("Web service rejected the token for {} stations", stations.len());
                return Err(RemoteError::Unauthorized {
                    url: self.data_url.clone(),
                });
            }
            Err(e) => return Err(e),
        };
        let df = read_positional_csv(bytes, &self.data_url, &WEB_SERVICE_COLUMNS).await?;
        let rows = frame_to_rows(&df).map_err(|source| RemoteError::CsvRead {
            url: self.data_url.clone(),
            source,
        })?;
        let observations = web_service_observations(&rows);
        info!("Fetched {} web service observations", observations.len());
        Ok(observations)
    }
}

fn is_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

pub fn web_service_observations(rows: &[WideRow]) -> Vec<WebServiceObservation> {
    rows.iter()
        .filter_map(|row| {
            let parameter = row.int("Parameter").and_then(|p| i32::try_from(p).ok())?;
            let entry = catalog_entry(parameter);
            Some(WebServiceObservation {
                station_number: row.text("STATION_NUMBER")?,
                date: row.text("Date")?.time_span()?.start.naive_utc(),
                parameter,
                name_en: entry.map(|e| e.name_en.to_string()),
                unit: entry.map(|e| e.unit.to_string()),
                code: entry.map(|e| e.code.to_string()),
                value: row.float("Value"),
                grade: row.text("Grade"),
                symbol: row.text("Symbol"),
                approval: row.text("Approval"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::transport::fake::FakeTransport;
    use chrono::TimeZone;

    const DATA: &str = "https://ws.example/services/real_time_data/csv/inline";
    const AUTH: &str = "https://ws.example/services/auth";

    fn client(transport: FakeTransport) -> WebServiceClient {
        WebServiceClient::new(Arc::new(transport), DATA, AUTH)
    }

    fn span() -> TimeSpan {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).single().expect("valid start");
        let end = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).single().expect("valid end");
        TimeSpan { start, end }
    }

    #[test]
    fn test_token_expiry() {
        let issued = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid time");
        let token = Token::new("abc", issued);
        assert!(!token.is_expired_at(issued + Duration::minutes(9)));
        assert!(token.is_expired_at(issued + Duration::minutes(10)));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = WebServiceCredentials::new("user", "hunter2");
        assert!(!format!("{:?}", credentials).contains("hunter2"));
    }

    #[test]
    fn test_request_url() -> Result<(), RemoteError> {
        let token = Token::new("tok", Utc::now());
        let url = client(FakeTransport::new()).request_url(
            &["08MF005".to_string(), "05AA008".to_string()],
            &[46, 47],
            span(),
            &token,
        )?;
        assert!(url.starts_with(DATA));
        assert!(url.contains("stations%5B%5D=08MF005&stations%5B%5D=05AA008"));
        assert!(url.contains("parameters%5B%5D=46&parameters%5B%5D=47"));
        assert!(url.contains("start_date=2024-05-01+00%3A00%3A00"));
        assert!(url.ends_with("token=tok"));
        Ok(())
    }

    #[tokio::test]
    async fn test_issue_token() -> Result<(), RemoteError> {
        let token = client(FakeTransport::new().with_body(AUTH, "  tok-123\n"))
            .issue_token(&WebServiceCredentials::new("user", "pass"))
            .await?;
        assert_eq!(token.value(), "tok-123");
        assert!(!token.is_expired());
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let result = client(FakeTransport::new().with_status(AUTH, 401))
            .issue_token(&WebServiceCredentials::new("user", "wrong"))
            .await;
        assert!(matches!(result, Err(ref e) if e.is_auth_failure()));
    }

    #[tokio::test]
    async fn test_unprocessable_credentials_are_rejected() {
        let result = client(FakeTransport::new().with_status(AUTH, 422))
            .issue_token(&WebServiceCredentials::new("user", "wrong"))
            .await;
        assert!(matches!(result, Err(RemoteError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_forbidden_data_request_is_an_auth_failure() {
        let token = Token::new("revoked", Utc::now());
        let result = client(FakeTransport::new().with_status(DATA, 403))
            .fetch(&["08MF005".to_string()], &[46], span(), &token)
            .await;
        assert!(matches!(result, Err(ref e) if e.is_auth_failure()));
    }

    #[tokio::test]
    async fn test_server_error_is_not_an_auth_failure() {
        let token = Token::new("tok", Utc::now());
        let result = client(FakeTransport::new().with_status(DATA, 503))
            .fetch(&["08MF005".to_string()], &[46], span(), &token)
            .await;
        assert!(matches!(result, Err(RemoteError::HttpStatus { .. })));
        assert!(!result.is_err_and(|e| e.is_auth_failure()));
    }

    #[tokio::test]
    async fn test_fetch_joins_catalog() -> Result<(), RemoteError> {
        let body = "ID,Date,Parameter/Paramètre,Value/Valeur,Qualifier/Qualificatif,Symbol/Symbole,Approval/Approbation,Grade/Classification,Qualifiers/Qualificatifs\n\
08MF005,2024-05-01T08:00:00Z,47,2110,,,Provisional/Provisoire,-1,\n\
08MF005,2024-05-01T08:00:00Z,46,4.52,,B,Provisional/Provisoire,-1,\n\
08MF005,2024-05-01T08:00:00Z,999,1.0,,,,,\n";
        let transport = FakeTransport::new().with_body(DATA, body);
        let token = Token::new("tok", Utc::now());
        let rows = client(transport)
            .fetch(&["08MF005".to_string()], &[46, 47], span(), &token)
            .await?;

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].parameter, 47);
        assert_eq!(rows[0].code.as_deref(), Some("QR"));
        assert_eq!(rows[0].unit.as_deref(), Some("m3/s"));
        assert_eq!(rows[1].symbol.as_deref(), Some("B"));
        assert_eq!(rows[1].value, Some(4.52));
        assert_eq!(rows[2].name_en, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_token_is_refused_before_request() {
        let transport = Arc::new(FakeTransport::new().with_body(DATA, ""));
        let client = WebServiceClient::new(transport.clone(), DATA, AUTH);
        let stale = Token::new("tok", Utc::now() - Duration::minutes(11));
        let result = client.fetch(&["08MF005".to_string()], &[46], span(), &stale).await;
        assert!(matches!(result, Err(RemoteError::TokenExpired { .. })));
        assert!(transport.requested().is_empty());
    }
}
