pub mod archive;
mod error;
mod hydat;
pub mod remote;
pub mod stations;
pub mod tidy;
mod types;
mod utils;

pub use error::{ErrorKind, HydatError};
pub use hydat::Hydat;

pub use archive::error::ArchiveError;
pub use archive::memory::MemoryArchive;
pub use archive::sqlite::SqliteArchive;
pub use archive::{ArchiveConnection, ArchiveReader, ArchiveTable, ScanFilter};

pub use remote::datamart::{DatamartClient, Resolution};
pub use remote::endpoints::Endpoints;
pub use remote::error::RemoteError;
pub use remote::transport::{HttpTransport, Transport};
pub use remote::webservice::{Token, WebServiceClient, WebServiceCredentials};

pub use stations::directory::StationDirectory;
pub use stations::error::StationCacheError;

pub use tidy::cell::{Cell, WideRow};
pub use tidy::column_spec::{ColumnSpec, Subfield};
pub use tidy::completeness::{Completeness, CompletenessReport};
pub use tidy::merge::{MergedSeries, SeriesPoint};
pub use tidy::reshape::{pivot_wider, reshape, LongRow};

pub use types::dates::{AnyDate, AnyDateTime, DateSpan, Month, TimeSpan, Year};
pub use types::frame::HydatFrame;
pub use types::observation::{
    AnnualStatistic, DailyObservation, IntoFrame, MonthlyObservation, RealtimeObservation,
    SummaryStat, WebServiceObservation,
};
pub use types::parameter::{CatalogEntry, Parameter, PARAMETER_CATALOG};
pub use types::query::{DateWindow, QueryFilter};
pub use types::station::{Network, OperationalStatus, Station};
