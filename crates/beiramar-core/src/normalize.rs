//! Column-level cleaning primitives.
//!
//! Every operation consumes the table and hands back the transformed one.
//! Row-level failures (an unparsable date, a non-numeric cell) become nulls;
//! only schema problems such as a missing column are errors.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

use crate::error::TransformError;

/// Share of non-null values that must parse before a text column is promoted.
pub const DEFAULT_NUMERIC_THRESHOLD: f64 = 0.8;

const AUTO_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];
const AUTO_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Input convention accepted by [`normalize_datetime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateInput {
    /// `YYYY-MM-DD`, optionally followed by ` HH:MM:SS`.
    Iso,
    /// `MM/DD/YYYY`.
    Us,
    /// RFC 3339 first, then the ISO, US and day-first layouts in turn.
    Auto,
}

impl DateInput {
    pub fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        match self {
            DateInput::Iso => NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .or_else(|| parse_date(value, "%Y-%m-%d")),
            DateInput::Us => parse_date(value, "%m/%d/%Y"),
            DateInput::Auto => DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.naive_utc())
                .ok()
                .or_else(|| {
                    AUTO_DATETIME_FORMATS
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                })
                .or_else(|| AUTO_DATE_FORMATS.iter().find_map(|fmt| parse_date(value, fmt))),
        }
    }
}

fn parse_date(value: &str, fmt: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(value, fmt)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Canonical day-first rendering written back by [`normalize_datetime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOutput {
    Date,
    DateTime,
}

impl DateOutput {
    pub fn format(&self) -> &'static str {
        match self {
            DateOutput::Date => "%d/%m/%Y",
            DateOutput::DateTime => "%d/%m/%Y %H:%M:%S",
        }
    }
}

pub fn normalize_datetime(
    mut table: DataFrame,
    column: &str,
    input: DateInput,
    output: DateOutput,
) -> Result<DataFrame, TransformError> {
    const OP: &str = "normalize_datetime";

    let text = text_values(&table, OP, column)?;
    let values = text.str().map_err(TransformError::polars(OP))?;

    let mut failures = 0usize;
    let rewritten: Vec<Option<String>> = values
        .into_iter()
        .map(|value| {
            let value = value?;
            let parsed = input.parse(value);
            if parsed.is_none() {
                failures += 1;
            }
            parsed.map(|dt| dt.format(output.format()).to_string())
        })
        .collect();

    if failures > 0 {
        warn!(column, failures, "values did not match the declared date format");
    }

    table
        .with_column(string_series(column, &rewritten))
        .map_err(TransformError::polars(OP))?;
    Ok(table)
}

/// Exact-match lookup. The column becomes `Int64` when every non-null value
/// is mapped; otherwise it stays text and unmapped values pass through.
pub fn encode_binary(
    mut table: DataFrame,
    column: &str,
    mapping: &[(&str, i64)],
) -> Result<DataFrame, TransformError> {
    const OP: &str = "encode_binary";

    let source = require_column(&table, OP, column)?;
    if source.dtype() != &DataType::String {
        debug!(column, dtype = %source.dtype(), "column already encoded");
        return Ok(table);
    }
    let values = source.str().map_err(TransformError::polars(OP))?;

    let lookup = |value: &str| {
        mapping
            .iter()
            .find(|(label, _)| *label == value)
            .map(|(_, code)| *code)
    };

    let all_mapped = values.into_iter().flatten().all(|value| lookup(value).is_some());
    let series = if all_mapped {
        let codes: Vec<Option<i64>> = values
            .into_iter()
            .map(|value| value.and_then(lookup))
            .collect();
        Series::new(column.into(), codes)
    } else {
        let mixed: Vec<Option<String>> = values
            .into_iter()
            .map(|value| {
                value.map(|value| match lookup(value) {
                    Some(code) => code.to_string(),
                    None => value.to_string(),
                })
            })
            .collect();
        string_series(column, &mixed)
    };

    table.with_column(series).map_err(TransformError::polars(OP))?;
    Ok(table)
}

/// NFKD-decomposes every text column and keeps only the ASCII remainder.
pub fn strip_accents(table: DataFrame) -> Result<DataFrame, TransformError> {
    map_text_columns(table, "strip_accents", |value| {
        value.nfkd().filter(char::is_ascii).collect()
    })
}

pub fn uppercase_all(table: DataFrame) -> Result<DataFrame, TransformError> {
    map_text_columns(table, "uppercase_all", str::to_uppercase)
}

pub fn uppercase_column_names(mut table: DataFrame) -> Result<DataFrame, TransformError> {
    const OP: &str = "uppercase_column_names";

    let names: Vec<String> = table
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    let mut seen = HashSet::with_capacity(names.len());
    for name in &names {
        let upper = name.to_uppercase();
        if !seen.insert(upper.clone()) {
            return Err(TransformError::DuplicateColumn {
                operation: OP,
                column: upper,
            });
        }
    }

    for name in &names {
        let upper = name.to_uppercase();
        if upper != *name {
            table
                .rename(name, upper.as_str().into())
                .map_err(TransformError::polars(OP))?;
        }
    }
    Ok(table)
}

/// Promotes text columns holding comma-decimal numbers to `Float64`.
///
/// A column is promoted only when the share of its non-null values that parse
/// after `,` -> `.` is strictly greater than `threshold`; cells that still fail
/// become null. Columns below the threshold are left untouched.
pub fn coerce_decimal_commas(
    mut table: DataFrame,
    threshold: f64,
) -> Result<DataFrame, TransformError> {
    const OP: &str = "coerce_decimal_commas";

    for name in text_column_names(&table) {
        let column = require_column(&table, OP, name.as_str())?;
        let values = column.str().map_err(TransformError::polars(OP))?;

        let non_null = values.len() - values.null_count();
        if non_null == 0 {
            continue;
        }

        let parsed: Vec<Option<f64>> = values.into_iter().map(|v| v.and_then(parse_decimal)).collect();
        let converted = parsed.iter().filter(|value| value.is_some()).count();
        let ratio = converted as f64 / non_null as f64;

        if ratio > threshold {
            debug!(column = %name, ratio, "promoting column to numeric");
            table
                .with_column(Series::new(name, parsed))
                .map_err(TransformError::polars(OP))?;
        } else if converted > 0 {
            debug!(column = %name, ratio, threshold, "column left as text");
        }
    }

    Ok(table)
}

/// Forces one column to `Float64`. Numeric columns are cast; text columns are
/// parsed cell by cell with comma decimals accepted.
pub fn coerce_numeric(mut table: DataFrame, column: &str) -> Result<DataFrame, TransformError> {
    const OP: &str = "coerce_numeric";

    let source = require_column(&table, OP, column)?;
    let series = if is_numeric(source.dtype()) {
        source
            .cast(&DataType::Float64)
            .map_err(TransformError::polars(OP))?
            .as_materialized_series()
            .clone()
    } else {
        let text = source
            .cast(&DataType::String)
            .map_err(TransformError::polars(OP))?;
        let values = text.str().map_err(TransformError::polars(OP))?;
        let parsed: Vec<Option<f64>> = values.into_iter().map(|v| v.and_then(parse_decimal)).collect();
        Series::new(column.into(), parsed)
    };

    table.with_column(series).map_err(TransformError::polars(OP))?;
    Ok(table)
}

/// Keeps rows whose value in `column` is `>= 0`. Nulls are dropped as well.
/// Returns the filtered table and the number of rows removed.
pub fn filter_non_negative(
    table: DataFrame,
    column: &str,
) -> Result<(DataFrame, usize), TransformError> {
    const OP: &str = "filter_non_negative";

    let source = require_column(&table, OP, column)?;
    if !is_numeric(source.dtype()) {
        return Err(TransformError::UnexpectedType {
            operation: OP,
            column: column.to_string(),
            dtype: source.dtype().to_string(),
            expected: "numeric",
        });
    }

    let numeric = source
        .cast(&DataType::Float64)
        .map_err(TransformError::polars(OP))?;
    let values = numeric.f64().map_err(TransformError::polars(OP))?;
    let mask: BooleanChunked = values
        .into_iter()
        .map(|value| Some(value.is_some_and(|v| v >= 0.0)))
        .collect();

    let before = table.height();
    let filtered = table.filter(&mask).map_err(TransformError::polars(OP))?;
    let removed = before - filtered.height();
    Ok((filtered, removed))
}

pub(crate) fn parse_decimal(value: &str) -> Option<f64> {
    let cleaned = value.trim().replace(',', ".");
    cleaned.parse::<f64>().ok().filter(|v| !v.is_nan())
}

pub(crate) fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

pub(crate) fn require_column<'a>(
    table: &'a DataFrame,
    operation: &'static str,
    column: &str,
) -> Result<&'a Column, TransformError> {
    table
        .column(column)
        .map_err(|_| TransformError::MissingColumn {
            operation,
            column: column.to_string(),
        })
}

/// Returns the column cast to `String`, for steps that read cells as text.
pub(crate) fn text_values(
    table: &DataFrame,
    operation: &'static str,
    column: &str,
) -> Result<Column, TransformError> {
    require_column(table, operation, column)?
        .cast(&DataType::String)
        .map_err(TransformError::polars(operation))
}

pub(crate) fn string_series(name: &str, values: &[Option<String>]) -> Series {
    Series::new(
        name.into(),
        values
            .iter()
            .map(|opt| opt.as_deref())
            .collect::<Vec<Option<&str>>>(),
    )
}

fn text_column_names(table: &DataFrame) -> Vec<PlSmallStr> {
    table
        .get_columns()
        .iter()
        .filter(|column| column.dtype() == &DataType::String)
        .map(|column| column.name().clone())
        .collect()
}

fn map_text_columns(
    mut table: DataFrame,
    operation: &'static str,
    f: impl Fn(&str) -> String,
) -> Result<DataFrame, TransformError> {
    for name in text_column_names(&table) {
        let column = require_column(&table, operation, name.as_str())?;
        let values = column.str().map_err(TransformError::polars(operation))?;
        let mapped: Vec<Option<String>> = values.into_iter().map(|v| v.map(&f)).collect();
        table
            .with_column(string_series(name.as_str(), &mapped))
            .map_err(TransformError::polars(operation))?;
    }
    Ok(table)
}
