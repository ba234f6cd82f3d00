use std::sync::Arc;

use beiramar_bucket::BlobStore;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::{JobConfig, APPOINTMENTS_TRUSTED_KEY, REFINED_KEY, WEATHER_TRUSTED_KEY};
use crate::error::JobError;
use crate::io::{fetch_table, store_table, ReadOptions};
use crate::join::{
    appointment_join_key, drop_low_value_columns, left_join_on_key, match_stats,
    weather_join_key, JOIN_KEY,
};
use crate::prepare::appointments::SCHEDULED_DAY;
use crate::prepare::enrich_weather;
use crate::prepare::weather::AIR_TEMPERATURE;

const STAGE_READ: &str = "read";
const STAGE_ENRICH: &str = "enrich_weather";
const STAGE_KEYS: &str = "prepare_keys";
const STAGE_JOIN: &str = "join";
const STAGE_DROP: &str = "drop_columns";
const STAGE_PERSIST: &str = "persist";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinedSummary {
    pub message: String,
    pub total_rows: usize,
    pub rows_with_weather: usize,
    /// Formatted as `NN.NN%`.
    pub match_ratio: String,
    pub duplicate_weather_keys: usize,
    pub dropped_columns: usize,
    pub final_columns: usize,
    pub output: String,
}

/// Trusted -> refined: enriches weather, joins it onto appointments by hour.
pub struct RefinedJob {
    config: JobConfig,
    store: Arc<dyn BlobStore>,
}

impl RefinedJob {
    pub fn new(config: JobConfig, store: Arc<dyn BlobStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub async fn run(&self, _trigger: &Value) -> Result<RefinedSummary, JobError> {
        let config = &self.config;
        info!(
            trusted = %config.trusted_bucket,
            refined = %config.refined_bucket,
            "starting trusted -> refined job"
        );

        let appointments = fetch_table(
            self.store.as_ref(),
            &config.trusted_bucket,
            APPOINTMENTS_TRUSTED_KEY,
            &ReadOptions::comma(),
        )
        .await
        .map_err(|err| JobError::new(STAGE_READ, err))?;
        let weather = fetch_table(
            self.store.as_ref(),
            &config.trusted_bucket,
            WEATHER_TRUSTED_KEY,
            &ReadOptions::comma(),
        )
        .await
        .map_err(|err| JobError::new(STAGE_READ, err))?;

        let weather = enrich_weather(weather).map_err(|err| JobError::new(STAGE_ENRICH, err))?;

        let weather = weather_join_key(weather).map_err(|err| JobError::new(STAGE_KEYS, err))?;
        let appointments = appointment_join_key(appointments, SCHEDULED_DAY)
            .map_err(|err| JobError::new(STAGE_KEYS, err))?;

        let joined = left_join_on_key(appointments, &weather, JOIN_KEY)
            .map_err(|err| JobError::new(STAGE_JOIN, err))?;
        let stats = match_stats(&joined.table, AIR_TEMPERATURE)
            .map_err(|err| JobError::new(STAGE_JOIN, err))?;
        info!(
            rows = stats.total_rows,
            matched = stats.matched_rows,
            ratio = %stats.display_ratio(),
            "appointments matched with weather"
        );

        let (mut refined, dropped_columns) =
            drop_low_value_columns(joined.table).map_err(|err| JobError::new(STAGE_DROP, err))?;

        let output = store_table(
            self.store.as_ref(),
            &config.refined_bucket,
            REFINED_KEY,
            &mut refined,
        )
        .await
        .map_err(|err| JobError::new(STAGE_PERSIST, err))?;

        Ok(RefinedSummary {
            message: "refined dataset written".to_string(),
            total_rows: stats.total_rows,
            rows_with_weather: stats.matched_rows,
            match_ratio: stats.display_ratio(),
            duplicate_weather_keys: joined.duplicate_keys,
            dropped_columns,
            final_columns: refined.width(),
            output,
        })
    }
}
