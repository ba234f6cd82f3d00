use beiramar_core::normalize::DEFAULT_NUMERIC_THRESHOLD;
use beiramar_core::prepare::appointments::{AGE, APPOINTMENT_DAY, NO_SHOW, SCHEDULED_DAY};
use beiramar_core::prepare::weather::{AIR_TEMPERATURE, DATE, DISCARDED, HOUR_UTC, WEATHER_COLUMNS};
use beiramar_core::join::{weather_join_key, JOIN_KEY};
use beiramar_core::prepare::{enrich_weather, prepare_appointments, prepare_weather};
use beiramar_core::TransformError;
use polars::df;
use polars::prelude::*;

fn raw_appointments() -> PolarsResult<DataFrame> {
    df!(
        "PatientId" => [29872499824296i64, 558997776694438, 4262962299951],
        "Gender" => ["F", "M", "F"],
        "ScheduledDay" => ["2016-04-29T18:38:08Z", "2016-04-29T16:08:27Z", "2016-04-29T16:19:04Z"],
        "AppointmentDay" => ["2016-04-29T00:00:00Z", "2016-04-29T00:00:00Z", "2016-05-02T00:00:00Z"],
        "Age" => [62i64, -1, 8],
        "Neighbourhood" => ["JARDIM DA PENHA", "São Pedro", "mata da praia"],
        "No-show" => ["No", "Yes", "No"],
    )
}

fn raw_weather() -> PolarsResult<DataFrame> {
    raw_weather_with_hours(Series::new("Hora UTC".into(), ["16:00", "18:00"]).into())
}

fn raw_weather_with_hours(hours: Column) -> PolarsResult<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(WEATHER_COLUMNS.len());
    columns.push(Series::new("Data".into(), ["2016-04-29", "2016-04-29"]).into());
    columns.push(hours);
    for idx in 2..19 {
        let values = if idx == 7 { ["19,0", "22,5"] } else { ["1,0", "2,0"] };
        columns.push(Series::new(format!("raw_{idx}").as_str().into(), values).into());
    }
    columns.push(Series::new("trailing".into(), [None::<&str>, None]).into());
    DataFrame::new(columns)
}

#[test]
fn appointment_pipeline_normalizes_and_filters() -> PolarsResult<()> {
    let prepared = prepare_appointments(raw_appointments()?).unwrap();
    let table = prepared.table;

    assert_eq!(prepared.removed, 1);
    assert_eq!(table.height(), 2);
    assert!(table
        .column(AGE)?
        .i64()?
        .into_iter()
        .all(|age| age.is_some_and(|age| age >= 0)));

    let scheduled = table.column(SCHEDULED_DAY)?.str()?;
    assert_eq!(scheduled.get(0), Some("29/04/2016 18:38:08"));
    assert_eq!(table.column(APPOINTMENT_DAY)?.str()?.get(1), Some("02/05/2016 00:00:00"));

    let no_show = table.column(NO_SHOW)?.i64()?;
    assert_eq!(no_show.into_iter().collect::<Vec<_>>(), vec![Some(0), Some(0)]);

    let neighbourhood = table.column("NEIGHBOURHOOD")?.str()?;
    assert_eq!(neighbourhood.get(1), Some("MATA DA PRAIA"));

    for name in table.get_column_names() {
        assert_eq!(name.as_str(), name.to_uppercase());
    }
    Ok(())
}

#[test]
fn accents_are_stripped_before_filtering() -> PolarsResult<()> {
    let mut raw = raw_appointments()?;
    raw.with_column(Series::new("Age".into(), [62i64, 30, 8]))?;
    let table = prepare_appointments(raw).unwrap().table;
    assert_eq!(table.column("NEIGHBOURHOOD")?.str()?.get(1), Some("SAO PEDRO"));
    Ok(())
}

#[test]
fn appointment_pipeline_reports_missing_column_with_operation() -> PolarsResult<()> {
    let raw = raw_appointments()?.drop("ScheduledDay")?;
    let err = prepare_appointments(raw).unwrap_err();
    match err {
        TransformError::MissingColumn { operation, column } => {
            assert_eq!(operation, "normalize_datetime");
            assert_eq!(column, "ScheduledDay");
        }
        other => panic!("unexpected error {other}"),
    }
    Ok(())
}

#[test]
fn weather_pipeline_renames_and_promotes_decimals() -> PolarsResult<()> {
    let table = prepare_weather(raw_weather()?, DEFAULT_NUMERIC_THRESHOLD).unwrap();

    assert_eq!(table.width(), 19);
    assert!(table.column(DISCARDED).is_err());
    assert_eq!(table.column(DATE)?.str()?.get(0), Some("29/04/2016"));
    assert_eq!(table.column(HOUR_UTC)?.dtype(), &DataType::String);
    assert_eq!(table.column(AIR_TEMPERATURE)?.f64()?.get(1), Some(22.5));
    assert_eq!(table.column("VENTO_VELOCIDADE_MS")?.f64()?.get(0), Some(1.0));
    Ok(())
}

#[test]
fn weather_pipeline_rejects_unexpected_width() -> PolarsResult<()> {
    let raw = raw_weather()?.drop("trailing")?;
    let err = prepare_weather(raw, DEFAULT_NUMERIC_THRESHOLD).unwrap_err();
    assert!(matches!(
        err,
        TransformError::ColumnCount {
            expected: 20,
            found: 19,
            ..
        }
    ));
    Ok(())
}

#[test]
fn enrich_weather_labels_each_observation() -> PolarsResult<()> {
    let table = prepare_weather(raw_weather()?, DEFAULT_NUMERIC_THRESHOLD).unwrap();
    let table = enrich_weather(table).unwrap();

    let seasons = table.column("ESTACAO_ANO")?.str()?;
    assert_eq!(seasons.get(0), Some("OUTONO"));
    let classes = table.column("CLASSIFICACAO_TEMP")?.str()?;
    assert_eq!(classes.get(0), Some("AGRADAVEL"));
    assert_eq!(classes.get(1), Some("AGRADAVEL"));
    Ok(())
}

#[test]
fn digit_hours_stay_text_and_still_key() -> PolarsResult<()> {
    let hours = Series::new("Hora UTC".into(), [1800i64, 0]).into();
    let table = prepare_weather(raw_weather_with_hours(hours)?, DEFAULT_NUMERIC_THRESHOLD).unwrap();

    let column = table.column(HOUR_UTC)?;
    assert_eq!(column.dtype(), &DataType::String);
    assert_eq!(column.str()?.get(0), Some("18:00"));
    assert_eq!(column.str()?.get(1), Some("00:00"));

    let keyed = weather_join_key(enrich_weather(table).unwrap()).unwrap();
    assert_eq!(keyed.column(JOIN_KEY)?.null_count(), 0);
    Ok(())
}

#[test]
fn digit_hour_strings_are_not_promoted() -> PolarsResult<()> {
    let hours = Series::new("Hora UTC".into(), ["1800", "1900"]).into();
    let table = prepare_weather(raw_weather_with_hours(hours)?, DEFAULT_NUMERIC_THRESHOLD).unwrap();
    assert_eq!(table.column(HOUR_UTC)?.str()?.get(1), Some("19:00"));
    Ok(())
}
