//! The two batch jobs: raw -> trusted and trusted -> refined.
//!
//! Each job is a linear list of labelled stages. The first failing stage
//! aborts the job; nothing is written unless every transformation succeeded.

mod refined;
mod trusted;

pub use refined::{RefinedJob, RefinedSummary};
pub use trusted::{TrustedJob, TrustedSummary};

use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::error::JobError;

pub const STATUS_OK: u16 = 200;
pub const STATUS_FAILED: u16 = 500;

/// Invocation result: `{"statusCode": 200, "body": {...}}` on success,
/// `{"statusCode": 500, "body": "<stage> failed: ..."}` on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: Value,
}

impl JobResponse {
    pub fn from_result<T: Serialize>(result: Result<T, JobError>) -> Self {
        match result {
            Ok(summary) => match serde_json::to_value(&summary) {
                Ok(body) => Self {
                    status_code: STATUS_OK,
                    body,
                },
                Err(err) => Self::failure(format!("serialize_summary failed: {err}")),
            },
            Err(err) => {
                error!(stage = err.stage, "job failed: {err}");
                Self::failure(err.to_string())
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }

    fn failure(message: String) -> Self {
        Self {
            status_code: STATUS_FAILED,
            body: Value::String(message),
        }
    }
}
