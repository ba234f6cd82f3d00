//! Hour-bucketed left join of appointments onto weather observations.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::JoinError;
use crate::prepare::weather::{hour_values, DATE, HOUR_UTC};

pub const JOIN_KEY: &str = "CHAVE_HORA";
pub const WEATHER_TIMESTAMP: &str = "DATA_HORA_CLIMA";
pub const RIGHT_SUFFIX: &str = "_RIGHT";

const MICROS_PER_HOUR: i64 = 3_600 * 1_000_000;
const APPOINTMENT_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";
const WEATHER_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Columns with little analytic value removed from the refined table.
pub const DROPPED_COLUMNS: [&str; 13] = [
    "ALCOHOLISM",
    "PRESSAO_ESTACAO_MB",
    "PRESSAO_MAX_MB",
    "PRESSAO_MIN_MB",
    "RADIACAO_KJ_M2",
    "TEMP_ORVALHO_C",
    "TEMP_ORVALHO_MAX_C",
    "TEMP_ORVALHO_MIN_C",
    "UMIDADE_MAX",
    "UMIDADE_MIN",
    "VENTO_DIRECAO_GRAUS",
    "VENTO_RAJADA_MAX_MS",
    "VENTO_VELOCIDADE_MS",
];

#[derive(Debug, Clone)]
pub struct JoinOutput {
    pub table: DataFrame,
    /// Right-side rows ignored because an earlier row already owned their key.
    pub duplicate_keys: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchStats {
    pub total_rows: usize,
    pub matched_rows: usize,
    /// Percentage in `[0, 100]`.
    pub match_ratio: f64,
}

impl MatchStats {
    pub fn display_ratio(&self) -> String {
        format!("{:.2}%", self.match_ratio)
    }
}

/// Builds the weather join key from the `DATA` and `HORA_UTC` columns.
///
/// Hours may be text (`HH:MM`, `HHMM`, `HHMM UTC`) or integers in `HHMM`
/// form. Observations are already hourly, so the combined timestamp is used
/// as is. Both source columns are dropped.
pub fn weather_join_key(mut table: DataFrame) -> Result<DataFrame, JoinError> {
    let dates = text_column(&table, "weather", DATE)?;
    let hours = table.column(HOUR_UTC).map_err(|_| JoinError::MissingColumn {
        side: "weather",
        column: HOUR_UTC.to_string(),
    })?;
    let hours = hour_values(hours)?;

    let micros: Vec<Option<i64>> = dates
        .str()?
        .into_iter()
        .zip(hours)
        .map(|(date, hour)| {
            let (date, hour) = (date?, hour?);
            let combined = format!("{} {}", date.trim(), hour);
            NaiveDateTime::parse_from_str(&combined, WEATHER_TIMESTAMP_FORMAT)
                .ok()
                .map(|dt| dt.and_utc().timestamp_micros())
        })
        .collect();

    let timestamps = timestamp_series(WEATHER_TIMESTAMP, micros)?;
    let key = timestamps.clone().with_name(JOIN_KEY.into());

    table.with_column(timestamps)?;
    table.with_column(key)?;
    table.drop_in_place(DATE)?;
    table.drop_in_place(HOUR_UTC)?;
    Ok(table)
}

/// Adds the join key as the scheduling timestamp floored to the hour.
/// Text values are read as `DD/MM/YYYY HH:MM:SS`; the source column is kept.
pub fn appointment_join_key(mut table: DataFrame, column: &str) -> Result<DataFrame, JoinError> {
    let source = table.column(column).map_err(|_| JoinError::MissingColumn {
        side: "appointment",
        column: column.to_string(),
    })?;

    let micros: Vec<Option<i64>> = match source.dtype() {
        DataType::String => source
            .str()?
            .into_iter()
            .map(|value| {
                NaiveDateTime::parse_from_str(value?.trim(), APPOINTMENT_TIMESTAMP_FORMAT)
                    .ok()
                    .map(|dt| dt.and_utc().timestamp_micros())
            })
            .collect(),
        DataType::Datetime(_, _) => {
            let physical = source
                .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
                .cast(&DataType::Int64)?;
            let values: Vec<Option<i64>> = physical.i64()?.into_iter().collect();
            values
        }
        other => {
            return Err(JoinError::KeyType {
                side: "appointment",
                column: column.to_string(),
                dtype: other.to_string(),
            })
        }
    };

    let floored = micros
        .into_iter()
        .map(|value| value.map(floor_to_hour))
        .collect();
    table.with_column(timestamp_series(JOIN_KEY, floored)?)?;
    Ok(table)
}

pub fn floor_to_hour(micros: i64) -> i64 {
    micros - micros.rem_euclid(MICROS_PER_HOUR)
}

/// Left outer join on `key`. Every left row appears exactly once, in order.
///
/// When several right rows share a key the first one in input order wins.
/// Null keys never match. Right columns whose names clash with left columns
/// receive [`RIGHT_SUFFIX`].
pub fn left_join_on_key(
    left: DataFrame,
    right: &DataFrame,
    key: &str,
) -> Result<JoinOutput, JoinError> {
    let left_keys = key_values(&left, "left", key)?;
    let right_keys = key_values(right, "right", key)?;

    let mut first_row: HashMap<i64, IdxSize> = HashMap::with_capacity(right_keys.len());
    let mut duplicate_keys = 0usize;
    for (idx, value) in right_keys.into_iter().enumerate() {
        let Some(value) = value else { continue };
        if first_row.contains_key(&value) {
            duplicate_keys += 1;
        } else {
            first_row.insert(value, idx as IdxSize);
        }
    }

    if duplicate_keys > 0 {
        warn!(duplicate_keys, key, "right table has repeated join keys; keeping first occurrence");
    }

    let gather: Vec<Option<IdxSize>> = left_keys
        .into_iter()
        .map(|value| value.and_then(|value| first_row.get(&value).copied()))
        .collect();
    let gather = IdxCa::from_iter_options("gather".into(), gather.into_iter());

    let mut table = left;
    let height = table.height();
    for column in right.get_columns() {
        if column.name().as_str() == key {
            continue;
        }
        let series = column.as_materialized_series();
        let joined = if right.height() == 0 {
            Series::full_null(series.name().clone(), height, series.dtype())
        } else {
            series.take(&gather)?
        };
        let joined = if table.get_column_index(column.name()).is_some() {
            let renamed = format!("{}{RIGHT_SUFFIX}", column.name());
            joined.with_name(renamed.as_str().into())
        } else {
            joined
        };
        table.with_column(joined)?;
    }

    info!(rows = table.height(), duplicate_keys, "tables joined");
    Ok(JoinOutput {
        table,
        duplicate_keys,
    })
}

/// Counts rows with a non-null value in `column`.
pub fn match_stats(table: &DataFrame, column: &str) -> Result<MatchStats, JoinError> {
    let values = table.column(column).map_err(|_| JoinError::MissingColumn {
        side: "joined",
        column: column.to_string(),
    })?;

    let total_rows = table.height();
    let matched_rows = total_rows - values.null_count();
    let match_ratio = if total_rows == 0 {
        0.0
    } else {
        matched_rows as f64 / total_rows as f64 * 100.0
    };

    Ok(MatchStats {
        total_rows,
        matched_rows,
        match_ratio,
    })
}

/// Removes whichever [`DROPPED_COLUMNS`] are present; absent ones are skipped.
pub fn drop_low_value_columns(mut table: DataFrame) -> Result<(DataFrame, usize), JoinError> {
    let mut dropped = 0usize;
    for name in DROPPED_COLUMNS {
        if table.get_column_index(name).is_some() {
            table.drop_in_place(name)?;
            dropped += 1;
        }
    }
    Ok((table, dropped))
}

fn text_column(table: &DataFrame, side: &'static str, name: &str) -> Result<Column, JoinError> {
    let column = table.column(name).map_err(|_| JoinError::MissingColumn {
        side,
        column: name.to_string(),
    })?;
    Ok(column.cast(&DataType::String)?)
}

fn timestamp_series(name: &str, micros: Vec<Option<i64>>) -> Result<Series, JoinError> {
    Ok(Series::new(name.into(), micros)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?)
}

fn key_values(
    table: &DataFrame,
    side: &'static str,
    key: &str,
) -> Result<Vec<Option<i64>>, JoinError> {
    let column = table.column(key).map_err(|_| JoinError::MissingColumn {
        side,
        column: key.to_string(),
    })?;

    match column.dtype() {
        DataType::Datetime(_, _) | DataType::Int64 => {
            let physical = column
                .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
                .cast(&DataType::Int64)?;
            let values: Vec<Option<i64>> = physical.i64()?.into_iter().collect();
            Ok(values)
        }
        other => Err(JoinError::KeyType {
            side,
            column: key.to_string(),
            dtype: other.to_string(),
        }),
    }
}
