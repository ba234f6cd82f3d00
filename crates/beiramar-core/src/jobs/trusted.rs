use std::sync::Arc;

use beiramar_bucket::BlobStore;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::{JobConfig, APPOINTMENTS_TRUSTED_KEY, WEATHER_TRUSTED_KEY};
use crate::error::JobError;
use crate::io::{fetch_table, store_table, ReadOptions};
use crate::prepare::{prepare_appointments, prepare_weather};

const STAGE_READ: &str = "read";
const STAGE_APPOINTMENTS: &str = "prepare_appointments";
const STAGE_WEATHER: &str = "prepare_weather";
const STAGE_PERSIST: &str = "persist";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrustedSummary {
    pub message: String,
    pub appointment_rows: usize,
    pub weather_rows: usize,
    pub removed_negative_age: usize,
    pub outputs: Vec<String>,
}

/// Raw -> trusted: cleans both datasets and stores them in the trusted tier.
pub struct TrustedJob {
    config: JobConfig,
    store: Arc<dyn BlobStore>,
}

impl TrustedJob {
    pub fn new(config: JobConfig, store: Arc<dyn BlobStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// The trigger payload is ignored.
    pub async fn run(&self, _trigger: &Value) -> Result<TrustedSummary, JobError> {
        let config = &self.config;
        info!(
            raw = %config.raw_bucket,
            trusted = %config.trusted_bucket,
            "starting raw -> trusted job"
        );

        let appointments = fetch_table(
            self.store.as_ref(),
            &config.raw_bucket,
            &config.appointments_raw_key,
            &ReadOptions::comma(),
        )
        .await
        .map_err(|err| JobError::new(STAGE_READ, err))?;
        let weather = fetch_table(
            self.store.as_ref(),
            &config.raw_bucket,
            &config.weather_raw_key,
            &ReadOptions::semicolon(),
        )
        .await
        .map_err(|err| JobError::new(STAGE_READ, err))?;

        let prepared = prepare_appointments(appointments)
            .map_err(|err| JobError::new(STAGE_APPOINTMENTS, err))?;
        let mut appointments = prepared.table;
        let mut weather = prepare_weather(weather, config.numeric_threshold)
            .map_err(|err| JobError::new(STAGE_WEATHER, err))?;

        let appointments_location = store_table(
            self.store.as_ref(),
            &config.trusted_bucket,
            APPOINTMENTS_TRUSTED_KEY,
            &mut appointments,
        )
        .await
        .map_err(|err| JobError::new(STAGE_PERSIST, err))?;
        let weather_location = store_table(
            self.store.as_ref(),
            &config.trusted_bucket,
            WEATHER_TRUSTED_KEY,
            &mut weather,
        )
        .await
        .map_err(|err| JobError::new(STAGE_PERSIST, err))?;

        info!(
            appointment_rows = appointments.height(),
            weather_rows = weather.height(),
            "raw -> trusted job finished"
        );

        Ok(TrustedSummary {
            message: "trusted datasets written".to_string(),
            appointment_rows: appointments.height(),
            weather_rows: weather.height(),
            removed_negative_age: prepared.removed,
            outputs: vec![appointments_location, weather_location],
        })
    }
}
