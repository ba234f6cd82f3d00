//! Batch ETL for the Beira Mar clinic: medical appointments and hourly weather
//! observations are cleaned into the trusted tier, then joined by hour into
//! the refined tier.

pub mod classify;
pub mod config;
pub mod error;
pub mod io;
pub mod jobs;
pub mod join;
pub mod normalize;
pub mod prepare;

pub use config::JobConfig;
pub use error::{JobError, JobErrorKind, JoinError, PersistError, ReadError, TransformError};
pub use jobs::{JobResponse, RefinedJob, RefinedSummary, TrustedJob, TrustedSummary};
