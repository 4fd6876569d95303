//! The main entry point: every archive and realtime query lives on [`Hydat`].

use crate::archive::layouts::{
    annual_statistics, daily_observations, monthly_observations, station_directory,
};
use crate::archive::sqlite::SqliteArchive;
use crate::archive::{release, ArchiveConnection, ArchiveReader, ArchiveTable, ScanFilter};
use crate::error::HydatError;
use crate::remote::datamart::{DatamartClient, Resolution, STATION_LIST_COLUMNS};
use crate::remote::endpoints::Endpoints;
use crate::remote::transport::{HttpTransport, Transport};
use crate::remote::webservice::{
    default_window, Token, WebServiceClient, WebServiceCredentials, MAX_STATIONS_PER_REQUEST,
};
use crate::stations::cache::RealtimeStationCache;
use crate::stations::directory::StationDirectory;
use crate::stations::resolver::{check_sentinel, normalize_ids, resolve, StationSelection};
use crate::tidy::cell::WideRow;
use crate::tidy::completeness::{report, CompletenessReport};
use crate::tidy::merge::{merge, MergedSeries};
use crate::types::dates::{AnyDateTime, TimeSpan};
use crate::types::frame::HydatFrame;
use crate::types::observation::{
    AnnualStatistic, DailyObservation, IntoFrame, MonthlyObservation, RealtimeObservation,
    WebServiceObservation,
};
use crate::types::parameter::{Parameter, DEFAULT_WS_PARAMETERS};
use crate::types::query::QueryFilter;
use crate::types::station::Station;
use crate::utils::{default_archive_path, ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use chrono::Utc;
use log::{debug, info, warn};
use polars::prelude::{DataFrame, IntoLazy};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Columns of the archive `STATIONS` table, in archive order.
pub const ARCHIVE_STATION_COLUMNS: [&str; 11] = [
    "STATION_NUMBER",
    "STATION_NAME",
    "PROV_TERR_STATE_LOC",
    "HYD_STATUS",
    "SED_STATUS",
    "LATITUDE",
    "LONGITUDE",
    "DRAINAGE_AREA_GROSS",
    "DRAINAGE_AREA_EFFECT",
    "RHBN",
    "REAL_TIME",
];

/// Station directory and table rows read through one archive connection.
struct ArchiveScan {
    directory: StationDirectory,
    selection: StationSelection,
    tables: Vec<(ArchiveTable, Vec<WideRow>)>,
}

/// The client for the hydrometric archive and the realtime feeds.
///
/// Archive queries read the SQLite archive through an [`ArchiveReader`]; realtime queries go
/// through a [`Transport`] to the datamart and the web service. Every query returns a
/// [`HydatFrame`]: the tidy table plus a [`CompletenessReport`] naming the requested
/// stations that produced no rows.
///
/// Create one with [`Hydat::new()`] (default archive and cache locations),
/// [`Hydat::with_archive()`] or the [`Hydat::custom()`] builder.
///
/// # Examples
///
/// ```no_run
/// # use hydat::{Hydat, HydatError};
/// # async fn run() -> Result<(), HydatError> {
/// let hydat = Hydat::with_archive("/data/Hydat.sqlite3").await?;
/// let levels = hydat
///     .daily_levels()
///     .prov_terr_state_loc(&["PE"])
///     .start_date("2015-01-01")
///     .end_date("2015-12-31")
///     .call()
///     .await?;
/// println!("{}", levels.report);
/// # Ok(())
/// # }
/// ```
pub struct Hydat {
    archive: Arc<dyn ArchiveReader>,
    datamart: DatamartClient,
    web_service: WebServiceClient,
    station_cache: Option<RealtimeStationCache>,
    realtime_directory: Mutex<Option<StationDirectory>>,
}

#[bon]
impl Hydat {
    /// Uses the archive at `<user data dir>/hydat_rs/Hydat.sqlite3` and caches the realtime
    /// station list under the user cache directory.
    ///
    /// # Errors
    ///
    /// [`HydatError::DirResolution`] when the user directories cannot be determined,
    /// [`HydatError::CacheDirCreation`] when the cache directory cannot be created. A missing
    /// archive file is only reported when a query opens it.
    pub async fn new() -> Result<Self, HydatError> {
        Self::with_archive(default_archive_path()?).await
    }

    /// Uses the archive file at `path` and the default cache directory.
    pub async fn with_archive(path: impl Into<PathBuf>) -> Result<Self, HydatError> {
        Self::custom()
            .archive(Arc::new(SqliteArchive::new(path)))
            .cache_folder(get_cache_dir()?)
            .call()
            .await
    }

    /// Builds a client from explicit parts.
    ///
    /// * `.archive(Arc<dyn ArchiveReader>)`: **Required.**
    /// * `.transport(Arc<dyn Transport>)`: defaults to [`HttpTransport`].
    /// * `.cache_folder(PathBuf)`: where the realtime station list is cached. Without it the
    ///   list is only kept in memory.
    /// * `.endpoints(Endpoints)`: defaults to the public datamart and web service.
    #[builder]
    pub async fn custom(
        archive: Arc<dyn ArchiveReader>,
        transport: Option<Arc<dyn Transport>>,
        cache_folder: Option<PathBuf>,
        endpoints: Option<Endpoints>,
    ) -> Result<Self, HydatError> {
        let transport = transport.unwrap_or_else(|| Arc::new(HttpTransport::new()));
        let endpoints = endpoints.unwrap_or_default();
        let station_cache = match cache_folder {
            Some(folder) => {
                ensure_cache_dir_exists(&folder).await?;
                Some(RealtimeStationCache::new(&folder))
            }
            None => None,
        };

        Ok(Self {
            archive,
            datamart: DatamartClient::new(Arc::clone(&transport), endpoints.datamart),
            web_service: WebServiceClient::new(transport, endpoints.web_service, endpoints.auth),
            station_cache,
            realtime_directory: Mutex::new(None),
        })
    }

    /// Station metadata from the archive `STATIONS` table.
    ///
    /// * `.station_number(&[&str])`: explicit stations.
    /// * `.prov_terr_state_loc(&[&str])`: stations of these jurisdictions, used when no
    ///   explicit list is given.
    ///
    /// With neither, every station in the archive is returned.
    #[builder]
    pub async fn stations(
        &self,
        station_number: Option<&[&str]>,
        prov_terr_state_loc: Option<&[&str]>,
    ) -> Result<HydatFrame, HydatError> {
        let filter = QueryFilter::new(station_number, prov_terr_state_loc, None, None)?;
        let scan = self.scan_archive(&filter, &[]).await?;
        let stations = scan.directory.select(&scan.selection.matched);
        let obtained = stations.iter().map(|s| s.station_number.clone()).collect();
        Self::finish("stations", &filter, &scan.selection, obtained, archive_station_frame(&stations)?)
    }

    /// Daily discharge (`DLY_FLOWS`), one row per station-day.
    ///
    /// * `.station_number(&[&str])` / `.prov_terr_state_loc(&[&str])`: station selection.
    /// * `.start_date(&str)` / `.end_date(&str)`: inclusive `YYYY-MM-DD` bounds.
    ///
    /// # Errors
    ///
    /// [`HydatError::InvalidArgument`] for malformed dates, `start_date > end_date` or the
    /// `"ALL"` station placeholder; all checked before the archive is opened.
    /// [`HydatError::NoData`] when exactly one station was requested and it has no rows.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use hydat::{Hydat, HydatError};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), HydatError> {
    /// let hydat = Hydat::new().await?;
    /// let flows = hydat
    ///     .daily_flows()
    ///     .station_number(&["08MF005"])
    ///     .start_date("1990-01-01")
    ///     .end_date("1990-12-31")
    ///     .call()
    ///     .await?
    ///     .collect()?;
    /// println!("{}", flows);
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn daily_flows(
        &self,
        station_number: Option<&[&str]>,
        prov_terr_state_loc: Option<&[&str]>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<HydatFrame, HydatError> {
        let filter = QueryFilter::new(station_number, prov_terr_state_loc, start_date, end_date)?;
        self.daily_query("daily_flows", &filter, &[ArchiveTable::DailyFlows])
            .await
    }

    /// Daily water levels (`DLY_LEVELS`). Same arguments as [`Hydat::daily_flows`].
    #[builder]
    pub async fn daily_levels(
        &self,
        station_number: Option<&[&str]>,
        prov_terr_state_loc: Option<&[&str]>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<HydatFrame, HydatError> {
        let filter = QueryFilter::new(station_number, prov_terr_state_loc, start_date, end_date)?;
        self.daily_query("daily_levels", &filter, &[ArchiveTable::DailyLevels])
            .await
    }

    /// Daily suspended sediment loads. The table has no symbol columns.
    #[builder]
    pub async fn sed_daily_loads(
        &self,
        station_number: Option<&[&str]>,
        prov_terr_state_loc: Option<&[&str]>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<HydatFrame, HydatError> {
        let filter = QueryFilter::new(station_number, prov_terr_state_loc, start_date, end_date)?;
        self.daily_query("sed_daily_loads", &filter, &[ArchiveTable::SedDailyLoads])
            .await
    }

    #[builder]
    pub async fn sed_daily_suscon(
        &self,
        station_number: Option<&[&str]>,
        prov_terr_state_loc: Option<&[&str]>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<HydatFrame, HydatError> {
        let filter = QueryFilter::new(station_number, prov_terr_state_loc, start_date, end_date)?;
        self.daily_query("sed_daily_suscon", &filter, &[ArchiveTable::SedDailySuscon])
            .await
    }

    /// Flows, levels, sediment loads and concentrations in one table, told apart by the
    /// `Parameter` column.
    #[builder]
    pub async fn daily(
        &self,
        station_number: Option<&[&str]>,
        prov_terr_state_loc: Option<&[&str]>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<HydatFrame, HydatError> {
        let filter = QueryFilter::new(station_number, prov_terr_state_loc, start_date, end_date)?;
        self.daily_query(
            "daily",
            &filter,
            &[
                ArchiveTable::DailyFlows,
                ArchiveTable::DailyLevels,
                ArchiveTable::SedDailyLoads,
                ArchiveTable::SedDailySuscon,
            ],
        )
        .await
    }

    /// Monthly mean, total, minimum and maximum discharge with the dates of the extremes.
    /// A month is kept when it overlaps the date bounds.
    #[builder]
    pub async fn monthly_flows(
        &self,
        station_number: Option<&[&str]>,
        prov_terr_state_loc: Option<&[&str]>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<HydatFrame, HydatError> {
        let filter = QueryFilter::new(station_number, prov_terr_state_loc, start_date, end_date)?;
        self.monthly_query("monthly_flows", &filter, Parameter::Flow)
            .await
    }

    /// Monthly water level summaries. Levels have no monthly total.
    #[builder]
    pub async fn monthly_levels(
        &self,
        station_number: Option<&[&str]>,
        prov_terr_state_loc: Option<&[&str]>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<HydatFrame, HydatError> {
        let filter = QueryFilter::new(station_number, prov_terr_state_loc, start_date, end_date)?;
        self.monthly_query("monthly_levels", &filter, Parameter::Level)
            .await
    }

    /// Annual mean, minimum and maximum of every parameter, from `ANNUAL_STATISTICS`.
    #[builder]
    pub async fn annual_stats(
        &self,
        station_number: Option<&[&str]>,
        prov_terr_state_loc: Option<&[&str]>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<HydatFrame, HydatError> {
        let filter = QueryFilter::new(station_number, prov_terr_state_loc, start_date, end_date)?;
        let scan = self
            .scan_archive(&filter, &[ArchiveTable::AnnualStatistics])
            .await?;
        let mut rows: Vec<AnnualStatistic> = scan
            .tables
            .iter()
            .flat_map(|(_, rows)| annual_statistics(rows))
            .filter(|row| filter.dates.overlaps_year(row.year))
            .collect();
        rows.sort_by(AnnualStatistic::tidy_order);
        let obtained = rows.iter().map(|r| r.station_number.clone()).collect();
        Self::finish(
            "annual_stats",
            &filter,
            &scan.selection,
            obtained,
            AnnualStatistic::into_frame(&rows)?,
        )
    }

    /// Archive stations whose name matches the case-insensitive regular expression.
    pub async fn search_stn_name(&self, pattern: &str) -> Result<HydatFrame, HydatError> {
        let directory = self.archive_directory().await?;
        let stations = directory
            .search_name(pattern)
            .map_err(|e| HydatError::invalid(format!("invalid search pattern: {}", e)))?;
        Ok(HydatFrame::new(
            archive_station_frame(&stations)?.lazy(),
            CompletenessReport::complete(),
        ))
    }

    /// Archive stations whose number matches the case-insensitive regular expression.
    pub async fn search_stn_number(&self, pattern: &str) -> Result<HydatFrame, HydatError> {
        let directory = self.archive_directory().await?;
        let stations = directory
            .search_number(pattern)
            .map_err(|e| HydatError::invalid(format!("invalid search pattern: {}", e)))?;
        Ok(HydatFrame::new(
            archive_station_frame(&stations)?.lazy(),
            CompletenessReport::complete(),
        ))
    }

    /// The realtime station list of the datamart, optionally restricted to jurisdictions.
    ///
    /// The list is fetched once per client and cached on disk for a day.
    #[builder]
    pub async fn realtime_stations(
        &self,
        prov_terr_state_loc: Option<&[&str]>,
    ) -> Result<HydatFrame, HydatError> {
        let filter = QueryFilter::new(None, prov_terr_state_loc, None, None)?;
        let directory = self.realtime_directory().await?;
        let selection = resolve(&directory, None, filter.prov_terr_state_loc.as_deref())?;
        let stations = directory.select(&selection.matched);
        let df = Station::into_frame(&stations)?.select(STATION_LIST_COLUMNS)?;
        Ok(HydatFrame::new(df.lazy(), CompletenessReport::complete()))
    }

    /// The last 30 days of datamart observations.
    ///
    /// For each station the five-minute series and the daily means are fetched and merged:
    /// daily means are kept up to the first five-minute reading that has a value.
    /// Stations are fetched one after another. When only one of the two files can be
    /// fetched the station is served from that file alone; a station with neither is
    /// logged and listed in the report instead of failing the batch.
    ///
    /// * `.station_number(&[&str])` / `.prov_terr_state_loc(&[&str])`: at least one is
    ///   required.
    ///
    /// # Errors
    ///
    /// [`HydatError::InvalidArgument`] without a station or jurisdiction selection.
    #[builder]
    pub async fn realtime_dd(
        &self,
        station_number: Option<&[&str]>,
        prov_terr_state_loc: Option<&[&str]>,
    ) -> Result<HydatFrame, HydatError> {
        let filter = QueryFilter::new(station_number, prov_terr_state_loc, None, None)?;
        if filter.selects_everything() {
            return Err(HydatError::invalid(
                "realtime_dd needs a station_number or prov_terr_state_loc selection",
            ));
        }
        let directory = self.realtime_directory().await?;
        let selection = resolve(
            &directory,
            filter.station_number.as_deref(),
            filter.prov_terr_state_loc.as_deref(),
        )?;

        let mut rows: Vec<RealtimeObservation> = Vec::new();
        for station in directory.select(&selection.matched) {
            let series = self.fetch_realtime_station(&station).await;
            if series.is_empty() {
                warn!("No realtime data for {}", station.station_number);
            }
            rows.extend(series.observations);
        }
        rows.sort_by(RealtimeObservation::tidy_order);
        let obtained = rows.iter().map(|r| r.station_number.clone()).collect();
        Self::finish(
            "realtime_dd",
            &filter,
            &selection,
            obtained,
            RealtimeObservation::into_frame(&rows)?,
        )
    }

    /// Requests a web-service token. Tokens expire after ten minutes.
    pub async fn issue_token(
        &self,
        credentials: &WebServiceCredentials,
    ) -> Result<Token, HydatError> {
        Ok(self.web_service.issue_token(credentials).await?)
    }

    /// Realtime observations from the authenticated web service.
    ///
    /// * `.station_number(&[&str])`: **Required.** At most 300 stations.
    /// * `.parameters(&[i32])`: web-service parameter codes, default water level (46) and
    ///   discharge (47).
    /// * `.start_date(&str)` / `.end_date(&str)`: RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or
    ///   `YYYY-MM-DD`. Defaults to the last 30 days.
    /// * `.token(&Token)`: **Required.** From [`Hydat::issue_token`].
    ///
    /// # Errors
    ///
    /// [`HydatError::InvalidArgument`] for an empty or too long station list, an empty
    /// parameter list or bad dates. Expired or rejected tokens give
    /// [`ErrorKind::AuthFailure`](crate::ErrorKind::AuthFailure).
    #[builder]
    pub async fn realtime_ws(
        &self,
        station_number: &[&str],
        parameters: Option<&[i32]>,
        start_date: Option<&str>,
        end_date: Option<&str>,
        token: &Token,
    ) -> Result<HydatFrame, HydatError> {
        let stations = normalize_ids(station_number.iter().copied());
        check_sentinel(&stations)?;
        if stations.is_empty() {
            return Err(HydatError::invalid("realtime_ws needs at least one station_number"));
        }
        if stations.len() > MAX_STATIONS_PER_REQUEST {
            return Err(HydatError::invalid(format!(
                "realtime_ws accepts at most {} stations per request, got {}",
                MAX_STATIONS_PER_REQUEST,
                stations.len()
            )));
        }
        let parameters = parameters.unwrap_or(&DEFAULT_WS_PARAMETERS);
        if parameters.is_empty() {
            return Err(HydatError::invalid("realtime_ws needs at least one parameter"));
        }
        let span = request_span(start_date, end_date)?;

        let mut rows = self
            .web_service
            .fetch(&stations, parameters, span, token)
            .await?;
        rows.sort_by(WebServiceObservation::tidy_order);

        let filter = QueryFilter {
            station_number: Some(stations.clone()),
            ..QueryFilter::default()
        };
        let selection = StationSelection {
            requested: stations.iter().cloned().collect(),
            matched: stations.iter().cloned().collect(),
            unknown: BTreeSet::new(),
        };
        let obtained = rows.iter().map(|r| r.station_number.clone()).collect();
        Self::finish(
            "realtime_ws",
            &filter,
            &selection,
            obtained,
            WebServiceObservation::into_frame(&rows)?,
        )
    }
}

impl Hydat {
    async fn daily_query(
        &self,
        query: &str,
        filter: &QueryFilter,
        tables: &[ArchiveTable],
    ) -> Result<HydatFrame, HydatError> {
        let scan = self.scan_archive(filter, tables).await?;
        let mut rows: Vec<DailyObservation> = scan
            .tables
            .iter()
            .flat_map(|(table, rows)| daily_observations(*table, rows))
            .filter(|row| filter.dates.contains(row.date))
            .collect();
        rows.sort_by(DailyObservation::tidy_order);
        let obtained = rows.iter().map(|r| r.station_number.clone()).collect();
        Self::finish(query, filter, &scan.selection, obtained, DailyObservation::into_frame(&rows)?)
    }

    async fn monthly_query(
        &self,
        query: &str,
        filter: &QueryFilter,
        parameter: Parameter,
    ) -> Result<HydatFrame, HydatError> {
        let table = match parameter {
            Parameter::Level => ArchiveTable::DailyLevels,
            _ => ArchiveTable::DailyFlows,
        };
        let scan = self.scan_archive(filter, &[table]).await?;
        let mut rows: Vec<MonthlyObservation> = scan
            .tables
            .iter()
            .flat_map(|(_, rows)| monthly_observations(parameter, rows))
            .filter(|row| filter.dates.overlaps_month(row.year, row.month))
            .collect();
        rows.sort_by(MonthlyObservation::tidy_order);
        let obtained = rows.iter().map(|r| r.station_number.clone()).collect();
        Self::finish(query, filter, &scan.selection, obtained, MonthlyObservation::into_frame(&rows)?)
    }

    /// Opens one connection, reads through it and closes it whatever the outcome.
    async fn scan_archive(
        &self,
        filter: &QueryFilter,
        tables: &[ArchiveTable],
    ) -> Result<ArchiveScan, HydatError> {
        let mut connection = self.archive.open().await?;
        let scan = Self::scan_with(connection.as_mut(), filter, tables).await;
        release(connection).await;
        scan
    }

    async fn scan_with(
        connection: &mut dyn ArchiveConnection,
        filter: &QueryFilter,
        tables: &[ArchiveTable],
    ) -> Result<ArchiveScan, HydatError> {
        let station_rows = connection
            .scan(ArchiveTable::Stations, &ScanFilter::all())
            .await?;
        let directory = station_directory(&station_rows);
        let selection = resolve(
            &directory,
            filter.station_number.as_deref(),
            filter.prov_terr_state_loc.as_deref(),
        )?;
        debug!(
            "Resolved {} of {} requested stations",
            selection.matched.len(),
            selection.requested.len()
        );

        let stations = if filter.selects_everything() {
            None
        } else {
            Some(selection.matched.clone())
        };
        let scan_filter = ScanFilter::for_stations(stations).with_years(filter.dates.years());
        let mut scanned = Vec::with_capacity(tables.len());
        for &table in tables {
            scanned.push((table, connection.scan(table, &scan_filter).await?));
        }

        Ok(ArchiveScan {
            directory,
            selection,
            tables: scanned,
        })
    }

    async fn archive_directory(&self) -> Result<StationDirectory, HydatError> {
        let scan = self.scan_archive(&QueryFilter::default(), &[]).await?;
        Ok(scan.directory)
    }

    /// Memoised realtime directory: memory, then the disk cache, then the datamart.
    async fn realtime_directory(&self) -> Result<StationDirectory, HydatError> {
        let mut memoised = self.realtime_directory.lock().await;
        if let Some(directory) = memoised.as_ref() {
            return Ok(directory.clone());
        }

        let stations = match self.load_cached_stations().await {
            Some(stations) => stations,
            None => {
                let stations = self.datamart.fetch_station_list().await?;
                self.store_cached_stations(&stations).await;
                stations
            }
        };
        let directory = StationDirectory::new(stations);
        *memoised = Some(directory.clone());
        Ok(directory)
    }

    async fn load_cached_stations(&self) -> Option<Vec<Station>> {
        let cache = self.station_cache.as_ref()?;
        match cache.load_fresh().await {
            Ok(stations) => stations,
            Err(e) => {
                warn!("Ignoring unreadable realtime station cache: {}", e);
                None
            }
        }
    }

    async fn store_cached_stations(&self, stations: &[Station]) {
        if let Some(cache) = &self.station_cache {
            if let Err(e) = cache.store(stations).await {
                warn!("Failed to write realtime station cache: {}", e);
            }
        }
    }

    /// Merges whichever of the two feeds could be fetched. A station with neither yields no
    /// rows and ends up in the report.
    async fn fetch_realtime_station(&self, station: &Station) -> MergedSeries<RealtimeObservation> {
        let hourly = self.fetch_realtime_feed(station, Resolution::Hourly).await;
        let daily = self.fetch_realtime_feed(station, Resolution::Daily).await;
        merge(&station.station_number, hourly, daily)
    }

    async fn fetch_realtime_feed(&self, station: &Station, resolution: Resolution) -> Vec<RealtimeObservation> {
        match self.datamart.fetch_series(station, resolution).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    "No {} realtime data for {}: {}",
                    resolution, station.station_number, e
                );
                Vec::new()
            }
        }
    }

    /// Applies the single-station rule, then builds, logs and attaches the report.
    fn finish(
        query: &str,
        filter: &QueryFilter,
        selection: &StationSelection,
        obtained: BTreeSet<String>,
        df: DataFrame,
    ) -> Result<HydatFrame, HydatError> {
        if filter.is_single_station() && df.height() == 0 {
            return Err(HydatError::NoData(format!("{} of {}", query, filter.describe())));
        }
        let report = report(&selection.requested, &obtained)
            .with_unknown(selection.unknown.iter().cloned());
        report.log(query);
        info!("{}: {} rows for {}", query, df.height(), filter.describe());
        Ok(HydatFrame::new(df.lazy(), report))
    }
}

fn request_span(start_date: Option<&str>, end_date: Option<&str>) -> Result<TimeSpan, HydatError> {
    let default = default_window(Utc::now());
    let start = match start_date {
        Some(text) => text
            .time_span()
            .ok_or_else(|| HydatError::invalid(format!("start_date '{}' is not a valid date", text)))?
            .start,
        None => default.start,
    };
    let end = match end_date {
        Some(text) => text
            .time_span()
            .ok_or_else(|| HydatError::invalid(format!("end_date '{}' is not a valid date", text)))?
            .end,
        None => default.end,
    };
    if start > end {
        return Err(HydatError::invalid(format!(
            "start_date {} is after end_date {}",
            start, end
        )));
    }
    Ok(TimeSpan { start, end })
}

fn archive_station_frame(stations: &[Station]) -> Result<DataFrame, HydatError> {
    Ok(Station::into_frame(stations)?.select(ARCHIVE_STATION_COLUMNS)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::memory::MemoryArchive;
    use crate::error::ErrorKind;
    use crate::remote::transport::fake::FakeTransport;
    use crate::tidy::cell::Cell;
    use crate::tidy::completeness::Completeness;
    use polars::prelude::DataType;
    use tempfile::tempdir;

    const DD: &str = "https://dd.example/hydrometric";
    const WS: &str = "https://ws.example/services/real_time_data/csv/inline";
    const AUTH: &str = "https://ws.example/services/auth";

    const DD_HEADER: &str = "ID,Date,Water Level / Niveau d'eau (m),Grade,Symbol / Symbole,QA/QC,Discharge / Débit (cms),Grade,Symbol / Symbole,QA/QC\n";

    fn endpoints() -> Endpoints {
        Endpoints {
            datamart: DD.to_string(),
            web_service: WS.to_string(),
            auth: AUTH.to_string(),
        }
    }

    fn station_row(number: &str, name: &str, prov: &str) -> WideRow {
        WideRow::new()
            .with("STATION_NUMBER", number)
            .with("STATION_NAME", name)
            .with("PROV_TERR_STATE_LOC", prov)
            .with("HYD_STATUS", "A")
            .with("RHBN", 0_i64)
            .with("REAL_TIME", 1_i64)
    }

    fn daily_row(number: &str, year: i64, prefix: &str, values: [f64; 2]) -> WideRow {
        WideRow::new()
            .with("STATION_NUMBER", number)
            .with("YEAR", year)
            .with("MONTH", 1_i64)
            .with("FULL_MONTH", 0_i64)
            .with("NO_DAYS", 31_i64)
            .with("MONTHLY_MEAN", (values[0] + values[1]) / 2.0)
            .with("MONTHLY_TOTAL", values[0] + values[1])
            .with("FIRST_DAY_MIN", 1_i64)
            .with("MIN", values[0])
            .with("FIRST_DAY_MAX", 2_i64)
            .with("MAX", values[1])
            .with(format!("{}1", prefix), values[0])
            .with(format!("{}_SYMBOL1", prefix), "B")
            .with(format!("{}2", prefix), values[1])
            .with(format!("{}_SYMBOL2", prefix), Cell::Null)
    }

    fn archive() -> MemoryArchive {
        MemoryArchive::new()
            .with_table(
                ArchiveTable::Stations,
                vec![
                    station_row("08MF005", "FRASER RIVER AT HOPE", "BC"),
                    station_row("08LA001", "CLEARWATER RIVER NEAR CLEARWATER STATION", "BC"),
                    station_row("05AA008", "CROWSNEST RIVER AT FRANK", "AB"),
                ],
            )
            .with_table(
                ArchiveTable::DailyFlows,
                vec![
                    daily_row("08MF005", 1990, "FLOW", [820.0, 815.0]),
                    daily_row("05AA008", 1990, "FLOW", [3.2, 3.1]),
                    daily_row("08MF005", 2005, "FLOW", [900.0, 905.0]),
                ],
            )
            .with_table(
                ArchiveTable::DailyLevels,
                vec![daily_row("08MF005", 1990, "LEVEL", [4.1, 4.2])],
            )
            .with_table(
                ArchiveTable::AnnualStatistics,
                vec![WideRow::new()
                    .with("STATION_NUMBER", "08MF005")
                    .with("DATA_TYPE", "Q")
                    .with("YEAR", 1990_i64)
                    .with("MEAN", 2700.0)
                    .with("MIN_MONTH", 2_i64)
                    .with("MIN_DAY", 11_i64)
                    .with("MIN", 790.0)
                    .with("MIN_SYMBOL", "B")
                    .with("MAX_MONTH", 6_i64)
                    .with("MAX_DAY", 9_i64)
                    .with("MAX", 9100.0)
                    .with("MAX_SYMBOL", Cell::Null)],
            )
    }

    async fn hydat(archive: &MemoryArchive, transport: FakeTransport) -> Result<Hydat, HydatError> {
        Hydat::custom()
            .archive(Arc::new(archive.clone()))
            .transport(Arc::new(transport))
            .endpoints(endpoints())
            .call()
            .await
    }

    fn strings(df: &DataFrame, column: &str) -> Vec<Option<String>> {
        df.column(column)
            .and_then(|c| c.cast(&DataType::String))
            .map(|c| {
                c.str()
                    .map(|s| s.into_iter().map(|v| v.map(str::to_string)).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_daily_flows_reports_unknown_station() -> Result<(), Box<dyn std::error::Error>> {
        let archive = archive();
        let client = hydat(&archive, FakeTransport::new()).await?;
        let flows = client
            .daily_flows()
            .station_number(&["08mf005", "05AA008", "99ZZ999"])
            .start_date("1990-01-01")
            .end_date("1990-12-31")
            .call()
            .await?;

        assert_eq!(archive.open_connections(), 0);
        assert_eq!(
            flows.report.status,
            Completeness::PartialWithDetail {
                missing: vec!["99ZZ999".to_string()]
            }
        );
        assert_eq!(flows.report.unknown, vec!["99ZZ999".to_string()]);

        let df = flows.collect()?;
        assert_eq!(df.height(), 4);
        assert_eq!(
            strings(&df, "STATION_NUMBER"),
            vec![
                Some("05AA008".to_string()),
                Some("05AA008".to_string()),
                Some("08MF005".to_string()),
                Some("08MF005".to_string()),
            ]
        );
        assert_eq!(strings(&df, "Symbol")[2].as_deref(), Some("B"));
        Ok(())
    }

    #[tokio::test]
    async fn test_date_window_is_inclusive() -> Result<(), Box<dyn std::error::Error>> {
        let client = hydat(&archive(), FakeTransport::new()).await?;
        let df = client
            .daily_flows()
            .station_number(&["08MF005"])
            .start_date("1990-01-02")
            .end_date("2005-01-01")
            .call()
            .await?
            .collect()?;
        assert_eq!(df.height(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_single_station_without_rows_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
        let archive = archive();
        let client = hydat(&archive, FakeTransport::new()).await?;
        let error = client
            .daily_flows()
            .station_number(&["08LA001"])
            .call()
            .await
            .err()
            .ok_or("expected an error")?;
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(archive.open_connections(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_arguments_fail_before_opening_the_archive() -> Result<(), Box<dyn std::error::Error>> {
        let client = Hydat::custom()
            .archive(Arc::new(SqliteArchive::new("/nonexistent/Hydat.sqlite3")))
            .transport(Arc::new(FakeTransport::new()))
            .call()
            .await?;

        let inverted = client
            .daily_levels()
            .station_number(&["08MF005"])
            .start_date("2020-01-01")
            .end_date("2019-01-01")
            .call()
            .await
            .err()
            .ok_or("expected an error")?;
        assert_eq!(inverted.kind(), ErrorKind::InvalidArgument);

        let sentinel = client
            .daily_flows()
            .station_number(&["ALL"])
            .call()
            .await
            .err()
            .ok_or("expected an error")?;
        assert_eq!(sentinel.kind(), ErrorKind::InvalidArgument);

        let missing = client.stations().call().await.err().ok_or("expected an error")?;
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        Ok(())
    }

    #[tokio::test]
    async fn test_jurisdiction_selection() -> Result<(), Box<dyn std::error::Error>> {
        let client = hydat(&archive(), FakeTransport::new()).await?;
        let flows = client
            .daily_flows()
            .prov_terr_state_loc(&["bc"])
            .call()
            .await?;
        assert_eq!(
            flows.report.status,
            Completeness::PartialWithDetail {
                missing: vec!["08LA001".to_string()]
            }
        );
        let df = flows.collect()?;
        assert_eq!(df.height(), 4);
        assert!(strings(&df, "STATION_NUMBER")
            .iter()
            .all(|s| s.as_deref() == Some("08MF005")));
        Ok(())
    }

    #[tokio::test]
    async fn test_daily_combines_parameters() -> Result<(), Box<dyn std::error::Error>> {
        let client = hydat(&archive(), FakeTransport::new()).await?;
        let df = client
            .daily()
            .station_number(&["08MF005"])
            .end_date("1999-12-31")
            .call()
            .await?
            .collect()?;
        assert_eq!(
            strings(&df, "Parameter"),
            vec![
                Some("FLOW".to_string()),
                Some("FLOW".to_string()),
                Some("LEVEL".to_string()),
                Some("LEVEL".to_string()),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_monthly_and_annual() -> Result<(), Box<dyn std::error::Error>> {
        let client = hydat(&archive(), FakeTransport::new()).await?;
        let monthly = client
            .monthly_levels()
            .station_number(&["08MF005"])
            .call()
            .await?
            .collect()?;
        assert_eq!(monthly.height(), 4);
        assert_eq!(monthly.width(), 8);

        let annual = client
            .annual_stats()
            .station_number(&["08MF005"])
            .start_date("1990-06-01")
            .call()
            .await?
            .collect()?;
        assert_eq!(annual.height(), 3);
        assert_eq!(
            strings(&annual, "Sum_stat"),
            vec![
                Some("MEAN".to_string()),
                Some("MIN".to_string()),
                Some("MAX".to_string())
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_station_queries() -> Result<(), Box<dyn std::error::Error>> {
        let client = hydat(&archive(), FakeTransport::new()).await?;
        let all = client.stations().call().await?.collect()?;
        assert_eq!(all.height(), 3);
        assert_eq!(all.get_column_names_str(), ARCHIVE_STATION_COLUMNS.to_vec());

        let found = client.search_stn_name("fraser").await?.collect()?;
        assert_eq!(strings(&found, "STATION_NUMBER"), vec![Some("08MF005".to_string())]);
        assert_eq!(found.width(), ARCHIVE_STATION_COLUMNS.len());

        let by_number = client.search_stn_number("^08").await?.collect()?;
        assert_eq!(by_number.height(), 2);
        assert!(by_number.column("TIMEZONE").is_err());

        let bad = client.search_stn_name("(").await.err().ok_or("expected an error")?;
        assert_eq!(bad.kind(), ErrorKind::InvalidArgument);
        Ok(())
    }

    fn datamart() -> FakeTransport {
        let list = "ID,Name / Nom,Latitude,Longitude,Prov/Terr,Timezone / Fuseau horaire\n\
08MF005,FRASER RIVER AT HOPE,49.38,-121.45,BC,UTC-08:00\n\
08LA001,CLEARWATER RIVER NEAR CLEARWATER STATION,51.64,-120.06,BC,UTC-08:00\n\
05AA008,CROWSNEST RIVER AT FRANK,49.59,-114.41,AB,UTC-07:00\n";
        FakeTransport::new()
            .with_body(format!("{}/doc/hydrometric_StationList.csv", DD), list)
            .with_body(
                format!("{}/BC/hourly/BC_08MF005_hourly_hydrometric.csv", DD),
                format!(
                    "{}08MF005,2024-05-02T00:00:00-08:00,4.52,,,1,2110,,,1\n\
08MF005,2024-05-02T01:00:00-08:00,4.55,,,1,2150,,,1\n",
                    DD_HEADER
                ),
            )
            .with_body(
                format!("{}/BC/daily/BC_08MF005_daily_hydrometric.csv", DD),
                format!(
                    "{}08MF005,2024-05-01T00:00:00-08:00,4.40,,,,2000,,,\n\
08MF005,2024-05-02T00:00:00-08:00,4.50,,,,2100,,,\n",
                    DD_HEADER
                ),
            )
            .with_body(
                format!("{}/AB/hourly/AB_05AA008_hourly_hydrometric.csv", DD),
                format!("{}05AA008,2024-05-02T00:00:00-07:00,1.2,,,,3.4,,,\n", DD_HEADER),
            )
            .with_body(
                format!("{}/AB/daily/AB_05AA008_daily_hydrometric.csv", DD),
                DD_HEADER,
            )
    }

    #[tokio::test]
    async fn test_realtime_batch_with_one_failing_station() -> Result<(), Box<dyn std::error::Error>> {
        let client = hydat(&archive(), datamart()).await?;
        let realtime = client
            .realtime_dd()
            .station_number(&["08MF005", "05AA008", "08LA001"])
            .call()
            .await?;

        assert_eq!(
            realtime.report.status,
            Completeness::PartialWithDetail {
                missing: vec!["08LA001".to_string()]
            }
        );
        let df = realtime.collect()?;
        // 08MF005: one daily mean before the first reading plus two readings, two
        // parameters each; 05AA008: one reading of two parameters
        assert_eq!(df.height(), 8);
        assert_eq!(strings(&df, "STATION_NUMBER")[0].as_deref(), Some("05AA008"));
        assert_eq!(strings(&df, "Parameter")[0].as_deref(), Some("FLOW"));
        assert_eq!(strings(&df, "PROV_TERR_STATE_LOC")[0].as_deref(), Some("AB"));
        Ok(())
    }

    #[tokio::test]
    async fn test_datamart_forbidden_is_a_missing_station() -> Result<(), Box<dyn std::error::Error>> {
        let transport = datamart()
            .with_status(format!("{}/BC/hourly/BC_08MF005_hourly_hydrometric.csv", DD), 403)
            .with_status(format!("{}/BC/daily/BC_08MF005_daily_hydrometric.csv", DD), 403);
        let client = hydat(&archive(), transport).await?;
        let realtime = client
            .realtime_dd()
            .station_number(&["05AA008", "08MF005"])
            .call()
            .await?;
        assert_eq!(
            realtime.report.status,
            Completeness::PartialWithDetail {
                missing: vec!["08MF005".to_string()]
            }
        );
        assert_eq!(realtime.collect()?.height(), 2);

        let alone = client
            .realtime_dd()
            .station_number(&["08MF005"])
            .call()
            .await
            .err()
            .ok_or("expected an error")?;
        assert_eq!(alone.kind(), ErrorKind::NotFound);

        let unscoped = client.realtime_dd().call().await.err().ok_or("expected an error")?;
        assert_eq!(unscoped.kind(), ErrorKind::InvalidArgument);
        Ok(())
    }

    #[tokio::test]
    async fn test_realtime_falls_back_to_the_remaining_feed() -> Result<(), Box<dyn std::error::Error>> {
        // 08MF005 has no hourly file, 05AA008 a failing daily file
        let transport = datamart()
            .with_status(format!("{}/BC/hourly/BC_08MF005_hourly_hydrometric.csv", DD), 404)
            .with_status(format!("{}/AB/daily/AB_05AA008_daily_hydrometric.csv", DD), 500);
        let client = hydat(&archive(), transport).await?;
        let realtime = client
            .realtime_dd()
            .station_number(&["08MF005", "05AA008"])
            .call()
            .await?;
        assert_eq!(realtime.report.status, Completeness::Complete);

        let df = realtime.collect()?;
        // 08MF005: both daily means of two parameters; 05AA008: one reading of two
        assert_eq!(df.height(), 6);
        let stations = strings(&df, "STATION_NUMBER");
        assert_eq!(
            stations.iter().filter(|s| s.as_deref() == Some("08MF005")).count(),
            4
        );
        assert_eq!(
            stations.iter().filter(|s| s.as_deref() == Some("05AA008")).count(),
            2
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_single_station_served_from_daily_means() -> Result<(), Box<dyn std::error::Error>> {
        let transport = datamart().with_status(
            format!("{}/BC/hourly/BC_08MF005_hourly_hydrometric.csv", DD),
            503,
        );
        let client = hydat(&archive(), transport).await?;
        let df = client
            .realtime_dd()
            .station_number(&["08MF005"])
            .call()
            .await?
            .collect()?;
        assert_eq!(df.height(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_realtime_station_list_is_cached() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let transport = Arc::new(datamart());
        let client = Hydat::custom()
            .archive(Arc::new(archive()))
            .transport(transport.clone())
            .cache_folder(dir.path().to_path_buf())
            .endpoints(endpoints())
            .call()
            .await?;

        let bc = client
            .realtime_stations()
            .prov_terr_state_loc(&["BC"])
            .call()
            .await?
            .collect()?;
        assert_eq!(bc.height(), 2);
        assert_eq!(bc.width(), 6);
        client.realtime_stations().call().await?;
        assert_eq!(transport.requested().len(), 1);

        // a fresh client reads the list from disk
        let offline = Hydat::custom()
            .archive(Arc::new(archive()))
            .transport(Arc::new(FakeTransport::new()))
            .cache_folder(dir.path().to_path_buf())
            .endpoints(endpoints())
            .call()
            .await?;
        let all = offline.realtime_stations().call().await?.collect()?;
        assert_eq!(all.height(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_realtime_ws() -> Result<(), Box<dyn std::error::Error>> {
        let body = "ID,Date,Parameter/Paramètre,Value/Valeur,Qualifier/Qualificatif,Symbol/Symbole,Approval/Approbation,Grade/Classification,Qualifiers/Qualificatifs\n\
08MF005,2024-05-01T08:05:00Z,47,2110,,,Provisional/Provisoire,-1,\n\
08MF005,2024-05-01T08:00:00Z,47,2100,,,Provisional/Provisoire,-1,\n";
        let transport = FakeTransport::new()
            .with_body(WS, body)
            .with_body(AUTH, "tok-123");
        let client = hydat(&archive(), transport).await?;
        let token = client
            .issue_token(&WebServiceCredentials::new("user", "pass"))
            .await?;

        let result = client
            .realtime_ws()
            .station_number(&["08MF005", "05AA008"])
            .parameters(&[47])
            .start_date("2024-05-01")
            .end_date("2024-05-01")
            .token(&token)
            .call()
            .await?;
        assert_eq!(
            result.report.status,
            Completeness::PartialWithDetail {
                missing: vec!["05AA008".to_string()]
            }
        );
        let df = result.collect()?;
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("Value")?.f64()?.get(0), Some(2100.0));
        assert_eq!(strings(&df, "Code")[0].as_deref(), Some("QR"));
        Ok(())
    }

    #[tokio::test]
    async fn test_realtime_ws_argument_checks() -> Result<(), Box<dyn std::error::Error>> {
        let client = hydat(&archive(), FakeTransport::new()).await?;
        let token = Token::new("tok", Utc::now());

        let ids: Vec<String> = (0..301).map(|i| format!("01AA{:03}", i)).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let too_many = client
            .realtime_ws()
            .station_number(&id_refs)
            .token(&token)
            .call()
            .await
            .err()
            .ok_or("expected an error")?;
        assert_eq!(too_many.kind(), ErrorKind::InvalidArgument);

        let no_parameters = client
            .realtime_ws()
            .station_number(&["08MF005"])
            .parameters(&[])
            .token(&token)
            .call()
            .await
            .err()
            .ok_or("expected an error")?;
        assert_eq!(no_parameters.kind(), ErrorKind::InvalidArgument);

        let expired = Token::new("tok", Utc::now() - chrono::Duration::minutes(30));
        let refused = client
            .realtime_ws()
            .station_number(&["08MF005"])
            .token(&expired)
            .call()
            .await
            .err()
            .ok_or("expected an error")?;
        assert_eq!(refused.kind(), ErrorKind::AuthFailure);
        Ok(())
    }
}
