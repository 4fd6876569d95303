//! CSV bodies of the remote feeds. The headers repeat column names (`Grade`, `Symbol` and
//! `QA/QC` appear once per parameter), so the header line is skipped and columns are named
//! by position.

use crate::remote::error::RemoteError;
use crate::tidy::cell::{Cell, WideRow};
use log::warn;
use polars::prelude::*;
use std::io::Cursor;
use tokio::task;

/// Parses a CSV body into a `DataFrame` of string columns named after `schema`.
pub(crate) async fn read_positional_csv(
    bytes: Vec<u8>,
    url: &str,
    schema: &'static [&'static str],
) -> Result<DataFrame, RemoteError> {
    let url = url.to_string();

    task::spawn_blocking(move || {
        let has_data_rows = bytes
            .split(|byte| *byte == b'\n')
            .skip(1)
            .any(|line| line.iter().any(|byte| !byte.is_ascii_whitespace()));
        if !has_data_rows {
            let columns = schema
                .iter()
                .map(|name| Column::new_empty((*name).into(), &DataType::String))
                .collect();
            return DataFrame::new(columns).map_err(|source| RemoteError::CsvRead { url, source });
        }

        let mut df = CsvReadOptions::default()
            .with_has_header(false)
            .with_skip_rows(1)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|source| RemoteError::CsvRead {
                url: url.clone(),
                source,
            })?;

        if df.width() != schema.len() {
            warn!(
                "CSV column count ({}) does not match schema length ({}) for {}",
                df.width(),
                schema.len(),
                url
            );
            return Err(RemoteError::SchemaMismatch {
                url,
                expected: schema.len(),
                found: df.width(),
            });
        }

        df.set_column_names(schema.iter().copied())
            .map_err(|source| RemoteError::ColumnRename { url, source })?;
        Ok(df)
    })
    .await?
}

/// Converts a frame into wide rows of text cells; blank strings become `Null`.
pub(crate) fn frame_to_rows(df: &DataFrame) -> PolarsResult<Vec<WideRow>> {
    let mut rows = vec![WideRow::new(); df.height()];
    for column in df.get_columns() {
        let name = column.name().to_string();
        let as_text = column.cast(&DataType::String)?;
        for (row, value) in rows.iter_mut().zip(as_text.str()?.into_iter()) {
            let cell = match value {
                Some(text) if !text.trim().is_empty() => Cell::Text(text.trim().to_string()),
                _ => Cell::Null,
            };
            row.insert(name.clone(), cell);
        }
    }
    Ok(rows)
}
