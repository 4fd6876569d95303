//! [`ArchiveReader`] over the SQLite distribution of the archive.

use crate::archive::error::ArchiveError;
use crate::archive::{ArchiveConnection, ArchiveReader, ArchiveTable, ScanFilter};
use crate::tidy::cell::{Cell, WideRow};
use async_trait::async_trait;
use log::{debug, info};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, QueryBuilder, Row, Sqlite, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};

/// Reads the archive from an SQLite file, opened read-only.
#[derive(Debug, Clone)]
pub struct SqliteArchive {
    path: PathBuf,
}

impl SqliteArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ArchiveReader for SqliteArchive {
    async fn open(&self) -> Result<Box<dyn ArchiveConnection>, ArchiveError> {
        if tokio::fs::metadata(&self.path).await.is_err() {
            return Err(ArchiveError::NotFound(self.path.clone()));
        }
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .read_only(true);
        let connection = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| ArchiveError::Open(self.path.clone(), e))?;
        info!("Opened archive {}", self.path.display());
        Ok(Box::new(SqliteArchiveConnection { connection }))
    }
}

struct SqliteArchiveConnection {
    connection: SqliteConnection,
}

#[async_trait]
impl ArchiveConnection for SqliteArchiveConnection {
    async fn scan(
        &mut self,
        table: ArchiveTable,
        filter: &ScanFilter,
    ) -> Result<Vec<WideRow>, ArchiveError> {
        if filter.is_empty_selection() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT * FROM {}", table.name()));
        let mut has_where = false;
        if let Some(stations) = &filter.stations {
            query.push(" WHERE STATION_NUMBER IN (");
            let mut separated = query.separated(", ");
            for station in stations {
                separated.push_bind(station.clone());
            }
            separated.push_unseparated(")");
            has_where = true;
        }
        if let (Some((start, end)), true) = (filter.years, table.has_year_column()) {
            query.push(if has_where { " AND " } else { " WHERE " });
            query
                .push("YEAR BETWEEN ")
                .push_bind(start)
                .push(" AND ")
                .push_bind(end);
        }
        debug!("Archive query: {}", query.sql());

        let rows = query
            .build()
            .fetch_all(&mut self.connection)
            .await
            .map_err(|source| ArchiveError::Query {
                table: table.name(),
                source,
            })?;
        debug!("{} rows from {}", rows.len(), table);

        rows.iter()
            .map(|row| {
                decode_row(row).map_err(|source| ArchiveError::Decode {
                    table: table.name(),
                    source,
                })
            })
            .collect()
    }

    async fn close(self: Box<Self>) -> Result<(), ArchiveError> {
        self.connection.close().await.map_err(ArchiveError::Close)
    }
}

/// Decodes by the storage class of each value, so declared column types do not matter.
fn decode_row(row: &SqliteRow) -> Result<WideRow, sqlx::Error> {
    let mut wide = WideRow::new();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;
        let cell = if raw.is_null() {
            Cell::Null
        } else {
            let storage_class = raw.type_info().name().to_ascii_uppercase();
            match storage_class.as_str() {
                "INTEGER" | "BOOLEAN" => Cell::Int(row.try_get_unchecked::<i64, _>(index)?),
                "REAL" | "NUMERIC" => Cell::Float(row.try_get_unchecked::<f64, _>(index)?),
                _ => Cell::Text(row.try_get_unchecked::<String, _>(index)?),
            }
        };
        wide.insert(column.name(), cell);
    }
    Ok(wide)
}
