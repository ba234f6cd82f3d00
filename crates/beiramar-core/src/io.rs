use std::io::Cursor;

use beiramar_bucket::{object_uri, BlobStore};
use bytes::Bytes;
use polars::prelude::*;
use tracing::info;

use crate::error::{PersistError, ReadError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub separator: u8,
}

impl ReadOptions {
    pub fn comma() -> Self {
        Self { separator: b',' }
    }

    pub fn semicolon() -> Self {
        Self { separator: b';' }
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::comma()
    }
}

/// Parses delimited text with a header row. Column types are inferred from
/// every row, so a late float or text cell widens the column instead of
/// failing the read.
pub fn read_table(bytes: Bytes, options: &ReadOptions) -> PolarsResult<DataFrame> {
    let parse_options = CsvParseOptions::default()
        .with_separator(options.separator)
        .with_encoding(CsvEncoding::LossyUtf8);

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(parse_options)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
}

/// Serializes a table as comma-delimited text with a header and no index column.
pub fn write_table(table: &mut DataFrame) -> PolarsResult<Vec<u8>> {
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .with_separator(b',')
        .finish(table)?;
    Ok(buffer)
}

pub async fn fetch_table(
    store: &dyn BlobStore,
    bucket: &str,
    key: &str,
    options: &ReadOptions,
) -> Result<DataFrame, ReadError> {
    let bytes = store
        .get_object(bucket, key)
        .await
        .map_err(|source| ReadError::Fetch {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source,
        })?;

    let table = read_table(bytes, options).map_err(|source| ReadError::Malformed {
        location: object_uri(bucket, key),
        source,
    })?;

    info!(
        location = %object_uri(bucket, key),
        rows = table.height(),
        columns = table.width(),
        "table read"
    );
    Ok(table)
}

pub async fn store_table(
    store: &dyn BlobStore,
    bucket: &str,
    key: &str,
    table: &mut DataFrame,
) -> Result<String, PersistError> {
    let payload = write_table(table)?;
    store
        .put_object(bucket, key, Bytes::from(payload), "text/csv")
        .await
        .map_err(|source| PersistError::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source,
        })?;

    let location = object_uri(bucket, key);
    info!(location = %location, rows = table.height(), "table written");
    Ok(location)
}
