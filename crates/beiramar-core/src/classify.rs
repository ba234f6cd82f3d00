//! Derived categorical features: Southern-hemisphere season and temperature
//! comfort class.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::error::TransformError;
use crate::normalize::{is_numeric, require_column, string_series, text_values};

pub const SEASON_COLUMN: &str = "ESTACAO_ANO";
pub const TEMPERATURE_CLASS_COLUMN: &str = "CLASSIFICACAO_TEMP";

const DAY_FIRST_DATE: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Summer,
    Autumn,
    Winter,
    Spring,
}

impl Season {
    pub fn label(&self) -> &'static str {
        match self {
            Season::Summer => "VERAO",
            Season::Autumn => "OUTONO",
            Season::Winter => "INVERNO",
            Season::Spring => "PRIMAVERA",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemperatureClass {
    VeryCold,
    Cold,
    Mild,
    Warm,
    VeryHot,
}

impl TemperatureClass {
    pub fn label(&self) -> &'static str {
        match self {
            TemperatureClass::VeryCold => "MUITO_FRIO",
            TemperatureClass::Cold => "FRIO",
            TemperatureClass::Mild => "AGRADAVEL",
            TemperatureClass::Warm => "QUENTE",
            TemperatureClass::VeryHot => "MUITO_QUENTE",
        }
    }
}

impl fmt::Display for TemperatureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Dec 21 - Mar 20 summer, Mar 21 - Jun 20 autumn, Jun 21 - Sep 21 winter,
/// Sep 22 - Dec 20 spring.
pub fn classify_season(date: NaiveDate) -> Season {
    match (date.month(), date.day()) {
        (12, d) if d >= 21 => Season::Summer,
        (1 | 2, _) => Season::Summer,
        (3, d) if d < 21 => Season::Summer,
        (3, _) | (4 | 5, _) => Season::Autumn,
        (6, d) if d < 21 => Season::Autumn,
        (6, _) | (7 | 8, _) => Season::Winter,
        (9, d) if d < 22 => Season::Winter,
        _ => Season::Spring,
    }
}

/// Season of a `DD/MM/YYYY` string; `None` when it does not parse.
pub fn parse_season(value: &str) -> Option<Season> {
    NaiveDate::parse_from_str(value.trim(), DAY_FIRST_DATE)
        .ok()
        .map(classify_season)
}

/// Half-open bands, lower bound inclusive: `<10`, `[10,17)`, `[17,24)`,
/// `[24,30)`, `>=30`. NaN has no class.
pub fn classify_temperature(value: f64) -> Option<TemperatureClass> {
    if value.is_nan() {
        return None;
    }
    let class = if value < 10.0 {
        TemperatureClass::VeryCold
    } else if value < 17.0 {
        TemperatureClass::Cold
    } else if value < 24.0 {
        TemperatureClass::Mild
    } else if value < 30.0 {
        TemperatureClass::Warm
    } else {
        TemperatureClass::VeryHot
    };
    Some(class)
}

/// Adds [`SEASON_COLUMN`] computed from a `DD/MM/YYYY` date column.
pub fn attach_season(mut table: DataFrame, date_column: &str) -> Result<DataFrame, TransformError> {
    const OP: &str = "attach_season";

    let text = text_values(&table, OP, date_column)?;
    let labels: Vec<Option<&str>> = text
        .str()
        .map_err(TransformError::polars(OP))?
        .into_iter()
        .map(|value| value.and_then(parse_season).map(|season| season.label()))
        .collect();

    table
        .with_column(Series::new(SEASON_COLUMN.into(), labels))
        .map_err(TransformError::polars(OP))?;
    Ok(table)
}

/// Adds [`TEMPERATURE_CLASS_COLUMN`]. A non-numeric source column yields
/// an all-null label column.
pub fn attach_temperature_class(
    mut table: DataFrame,
    column: &str,
) -> Result<DataFrame, TransformError> {
    const OP: &str = "attach_temperature_class";

    let source = require_column(&table, OP, column)?;
    let labels: Vec<Option<String>> = if is_numeric(source.dtype()) {
        let numeric = source
            .cast(&DataType::Float64)
            .map_err(TransformError::polars(OP))?;
        let classes: Vec<Option<String>> = numeric
            .f64()
            .map_err(TransformError::polars(OP))?
            .into_iter()
            .map(|value| {
                value
                    .and_then(classify_temperature)
                    .map(|class| class.label().to_string())
            })
            .collect();
        classes
    } else {
        vec![None; table.height()]
    };

    table
        .with_column(string_series(TEMPERATURE_CLASS_COLUMN, &labels))
        .map_err(TransformError::polars(OP))?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn season_boundaries() {
        assert_eq!(classify_season(date("2024-12-21")), Season::Summer);
        assert_eq!(classify_season(date("2024-12-20")), Season::Spring);
        assert_eq!(classify_season(date("2024-03-20")), Season::Summer);
        assert_eq!(classify_season(date("2024-03-21")), Season::Autumn);
        assert_eq!(classify_season(date("2024-06-20")), Season::Autumn);
        assert_eq!(classify_season(date("2024-06-21")), Season::Winter);
        assert_eq!(classify_season(date("2024-09-21")), Season::Winter);
        assert_eq!(classify_season(date("2024-09-22")), Season::Spring);
        assert_eq!(classify_season(date("2016-04-29")), Season::Autumn);
        assert_eq!(classify_season(date("2016-01-01")), Season::Summer);
    }

    #[test]
    fn parse_season_rejects_garbage() {
        assert_eq!(parse_season("29/04/2016"), Some(Season::Autumn));
        assert_eq!(parse_season("2016-04-29"), None);
        assert_eq!(parse_season(""), None);
    }

    #[test]
    fn temperature_band_ownership() {
        assert_eq!(classify_temperature(9.9), Some(TemperatureClass::VeryCold));
        assert_eq!(classify_temperature(10.0), Some(TemperatureClass::Cold));
        assert_eq!(classify_temperature(16.99), Some(TemperatureClass::Cold));
        assert_eq!(classify_temperature(17.0), Some(TemperatureClass::Mild));
        assert_eq!(classify_temperature(24.0), Some(TemperatureClass::Warm));
        assert_eq!(classify_temperature(29.9), Some(TemperatureClass::Warm));
        assert_eq!(classify_temperature(30.0), Some(TemperatureClass::VeryHot));
        assert_eq!(classify_temperature(-5.0), Some(TemperatureClass::VeryCold));
        assert_eq!(classify_temperature(f64::NAN), None);
    }

    #[test]
    fn attach_labels_to_table() -> PolarsResult<()> {
        let table = df!(
            "DATA" => [Some("29/04/2016"), Some("bad"), None],
            "TEMP_AR_C" => [Some(22.5), None, Some(31.0)],
        )?;
        let table = attach_season(table, "DATA").unwrap();
        let table = attach_temperature_class(table, "TEMP_AR_C").unwrap();

        let seasons = table.column(SEASON_COLUMN)?.str()?;
        assert_eq!(seasons.get(0), Some("OUTONO"));
        assert_eq!(seasons.get(1), None);
        assert_eq!(seasons.get(2), None);

        let classes = table.column(TEMPERATURE_CLASS_COLUMN)?.str()?;
        assert_eq!(classes.get(0), Some("AGRADAVEL"));
        assert_eq!(classes.get(1), None);
        assert_eq!(classes.get(2), Some("MUITO_QUENTE"));
        Ok(())
    }

    #[test]
    fn text_temperature_column_gets_null_classes() -> PolarsResult<()> {
        let table = df!("TEMP_AR_C" => ["22,5", "19,0"])?;
        let table = attach_temperature_class(table, "TEMP_AR_C").unwrap();
        assert_eq!(table.column(TEMPERATURE_CLASS_COLUMN)?.null_count(), 2);
        Ok(())
    }
}
