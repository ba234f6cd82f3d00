use std::env;

use thiserror::Error;

use crate::normalize::DEFAULT_NUMERIC_THRESHOLD;

pub const DEFAULT_RAW_BUCKET: &str = "raw-beira-mar";
pub const DEFAULT_TRUSTED_BUCKET: &str = "trusted-beira-mar";
pub const DEFAULT_REFINED_BUCKET: &str = "refined-beira-mar";

pub const DEFAULT_APPOINTMENTS_RAW_KEY: &str = "medical_appointments.csv";
pub const DEFAULT_WEATHER_RAW_KEY: &str = "meteorologia2016.csv";

pub const APPOINTMENTS_TRUSTED_KEY: &str = "clinica/medical_appointment_no_show.csv";
pub const WEATHER_TRUSTED_KEY: &str = "clima/clima.csv";
pub const REFINED_KEY: &str = "clinica_com_clima/cancelamentos_com_clima.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Bucket names, raw object keys and tunables shared by both jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    pub raw_bucket: String,
    pub trusted_bucket: String,
    pub refined_bucket: String,
    pub appointments_raw_key: String,
    pub weather_raw_key: String,
    pub numeric_threshold: f64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            raw_bucket: DEFAULT_RAW_BUCKET.to_string(),
            trusted_bucket: DEFAULT_TRUSTED_BUCKET.to_string(),
            refined_bucket: DEFAULT_REFINED_BUCKET.to_string(),
            appointments_raw_key: DEFAULT_APPOINTMENTS_RAW_KEY.to_string(),
            weather_raw_key: DEFAULT_WEATHER_RAW_KEY.to_string(),
            numeric_threshold: DEFAULT_NUMERIC_THRESHOLD,
        }
    }
}

impl JobConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset keys keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let set = |key: &str, field: &mut String| {
            if let Some(value) = lookup(key).filter(|value| !value.trim().is_empty()) {
                *field = value;
            }
        };

        set("BUCKET_RAW", &mut config.raw_bucket);
        set("BUCKET_TRUSTED", &mut config.trusted_bucket);
        set("BUCKET_REFINED", &mut config.refined_bucket);
        set("KEY_APPOINTMENTS_RAW", &mut config.appointments_raw_key);
        set("KEY_WEATHER_RAW", &mut config.weather_raw_key);

        if let Some(raw) = lookup("NUMERIC_THRESHOLD") {
            let threshold = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "NUMERIC_THRESHOLD",
                    value: raw.clone(),
                    reason: "not a number",
                })?;
            if !(0.0..1.0).contains(&threshold) {
                return Err(ConfigError::InvalidValue {
                    key: "NUMERIC_THRESHOLD",
                    value: raw,
                    reason: "must be in [0, 1)",
                });
            }
            config.numeric_threshold = threshold;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn unset_keys_keep_defaults() {
        let config = JobConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, JobConfig::default());
        assert_eq!(config.numeric_threshold, 0.8);
    }

    #[test]
    fn overrides_are_applied() {
        let vars: HashMap<&str, &str> = [
            ("BUCKET_TRUSTED", "trusted-test"),
            ("NUMERIC_THRESHOLD", "0.5"),
            ("BUCKET_RAW", "  "),
        ]
        .into_iter()
        .collect();
        let config = JobConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.trusted_bucket, "trusted-test");
        assert_eq!(config.raw_bucket, DEFAULT_RAW_BUCKET);
        assert_eq!(config.numeric_threshold, 0.5);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = JobConfig::from_lookup(|key| (key == "NUMERIC_THRESHOLD").then(|| "1.5".into()));
        assert!(matches!(err, Err(ConfigError::InvalidValue { .. })));
    }
}
