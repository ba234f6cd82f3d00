use polars::prelude::*;
use tracing::info;

use crate::classify::{attach_season, attach_temperature_class};
use crate::error::TransformError;
use crate::normalize::{
    coerce_decimal_commas, coerce_numeric, is_numeric, normalize_datetime, require_column,
    string_series, DateInput, DateOutput,
};

pub const DATE: &str = "DATA";
pub const HOUR_UTC: &str = "HORA_UTC";
pub const AIR_TEMPERATURE: &str = "TEMP_AR_C";
pub const DISCARDED: &str = "DESCARTAR";

/// Positional schema of the raw meteorological export.
pub const WEATHER_COLUMNS: [&str; 20] = [
    DATE,
    HOUR_UTC,
    "PRECIPITACAO_MM",
    "PRESSAO_ESTACAO_MB",
    "PRESSAO_MAX_MB",
    "PRESSAO_MIN_MB",
    "RADIACAO_KJ_M2",
    AIR_TEMPERATURE,
    "TEMP_ORVALHO_C",
    "TEMP_MAX_C",
    "TEMP_MIN_C",
    "TEMP_ORVALHO_MAX_C",
    "TEMP_ORVALHO_MIN_C",
    "UMIDADE_MAX",
    "UMIDADE_MIN",
    "UMIDADE_RELATIVA",
    "VENTO_DIRECAO_GRAUS",
    "VENTO_RAJADA_MAX_MS",
    "VENTO_VELOCIDADE_MS",
    DISCARDED,
];

/// First stage: canonical names, day-first dates, `HH:MM` hours, numeric
/// sensor columns.
pub fn prepare_weather(
    table: DataFrame,
    numeric_threshold: f64,
) -> Result<DataFrame, TransformError> {
    let table = rename_weather_columns(table)?;
    let table = normalize_datetime(table, DATE, DateInput::Iso, DateOutput::Date)?;
    let table = normalize_hours(table)?;
    let table = coerce_decimal_commas(table, numeric_threshold)?;

    info!(rows = table.height(), columns = table.width(), "weather prepared");
    Ok(table)
}

/// Second stage: season and temperature-class labels.
pub fn enrich_weather(table: DataFrame) -> Result<DataFrame, TransformError> {
    let table = coerce_numeric(table, AIR_TEMPERATURE)?;
    let table = attach_season(table, DATE)?;
    let table = attach_temperature_class(table, AIR_TEMPERATURE)?;

    info!(rows = table.height(), "weather enriched");
    Ok(table)
}

fn rename_weather_columns(mut table: DataFrame) -> Result<DataFrame, TransformError> {
    const OP: &str = "rename_weather_columns";

    if table.width() != WEATHER_COLUMNS.len() {
        return Err(TransformError::ColumnCount {
            operation: OP,
            expected: WEATHER_COLUMNS.len(),
            found: table.width(),
        });
    }

    let renamed: Vec<Column> = table
        .get_columns()
        .iter()
        .zip(WEATHER_COLUMNS)
        .map(|(column, name)| column.clone().with_name(name.into()))
        .collect();
    table = DataFrame::new(renamed).map_err(TransformError::polars(OP))?;

    table
        .drop_in_place(DISCARDED)
        .map_err(TransformError::polars(OP))?;
    Ok(table)
}

/// Rewrites [`HOUR_UTC`] as `HH:MM` text so the decimal-comma pass never
/// promotes it.
pub fn normalize_hours(mut table: DataFrame) -> Result<DataFrame, TransformError> {
    const OP: &str = "normalize_hours";

    let column = require_column(&table, OP, HOUR_UTC)?;
    let hours = hour_values(column).map_err(TransformError::polars(OP))?;
    table
        .with_column(string_series(HOUR_UTC, &hours))
        .map_err(TransformError::polars(OP))?;
    Ok(table)
}

/// Reads an hour column as `HH:MM` strings. Integer cells and bare digit
/// strings are `HHMM` with leading zeros optional, so `0` is midnight and
/// `1800` is 18:00. Anything else passes through trimmed.
pub(crate) fn hour_values(column: &Column) -> PolarsResult<Vec<Option<String>>> {
    if is_numeric(column.dtype()) {
        let numeric = column.cast(&DataType::Float64)?;
        let values: Vec<Option<String>> = numeric
            .f64()?
            .into_iter()
            .map(|value| {
                value
                    .filter(|v| v.is_finite() && v.fract() == 0.0 && *v >= 0.0)
                    .map(|v| canonical_hour(&(v as i64).to_string()))
            })
            .collect();
        return Ok(values);
    }

    let text = column.cast(&DataType::String)?;
    let values: Vec<Option<String>> = text
        .str()?
        .into_iter()
        .map(|value| value.map(canonical_hour))
        .collect();
    Ok(values)
}

fn canonical_hour(hour: &str) -> String {
    let hour = hour.trim();
    let hour = hour.strip_suffix("UTC").map(str::trim_end).unwrap_or(hour);
    if (1..=4).contains(&hour.len()) && hour.bytes().all(|b| b.is_ascii_digit()) {
        let padded = format!("{hour:0>4}");
        format!("{}:{}", &padded[..2], &padded[2..])
    } else {
        hour.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_hour_accepts_export_layouts() {
        assert_eq!(canonical_hour("18:00"), "18:00");
        assert_eq!(canonical_hour("1800 UTC"), "18:00");
        assert_eq!(canonical_hour("1800"), "18:00");
        assert_eq!(canonical_hour("0"), "00:00");
        assert_eq!(canonical_hour(" 900 "), "09:00");
        assert_eq!(canonical_hour("noon"), "noon");
    }

    #[test]
    fn numeric_hours_are_read_as_hhmm() -> PolarsResult<()> {
        let ints = Column::new("H".into(), [Some(1800i64), Some(0), None]);
        assert_eq!(
            hour_values(&ints)?,
            vec![Some("18:00".to_string()), Some("00:00".to_string()), None]
        );

        let floats = Column::new("H".into(), [1800.0f64, 1830.5]);
        assert_eq!(hour_values(&floats)?, vec![Some("18:00".to_string()), None]);
        Ok(())
    }
}
