use polars::prelude::DataFrame;
use tracing::{info, warn};

use crate::error::TransformError;
use crate::normalize::{
    encode_binary, filter_non_negative, normalize_datetime, strip_accents, uppercase_all,
    uppercase_column_names, DateInput, DateOutput,
};

pub const RAW_SCHEDULED_DAY: &str = "ScheduledDay";
pub const RAW_APPOINTMENT_DAY: &str = "AppointmentDay";

pub const SCHEDULED_DAY: &str = "SCHEDULEDDAY";
pub const APPOINTMENT_DAY: &str = "APPOINTMENTDAY";
pub const NO_SHOW: &str = "NO-SHOW";
pub const AGE: &str = "AGE";

pub const NO_SHOW_MAPPING: [(&str, i64); 2] = [("Yes", 1), ("No", 0)];

#[derive(Debug, Clone)]
pub struct PreparedAppointments {
    pub table: DataFrame,
    /// Rows dropped because their age was negative or missing.
    pub removed: usize,
}

pub fn prepare_appointments(table: DataFrame) -> Result<PreparedAppointments, TransformError> {
    let input_rows = table.height();

    let table = normalize_datetime(table, RAW_SCHEDULED_DAY, DateInput::Auto, DateOutput::DateTime)?;
    let table = normalize_datetime(table, RAW_APPOINTMENT_DAY, DateInput::Auto, DateOutput::DateTime)?;
    let table = uppercase_column_names(table)?;
    let table = encode_binary(table, NO_SHOW, &NO_SHOW_MAPPING)?;
    let table = strip_accents(table)?;
    let table = uppercase_all(table)?;
    let (table, removed) = filter_non_negative(table, AGE)?;

    if removed > 0 {
        warn!(removed, "dropped appointments with negative age");
    }
    info!(input_rows, rows = table.height(), "appointments prepared");

    Ok(PreparedAppointments { table, removed })
}
