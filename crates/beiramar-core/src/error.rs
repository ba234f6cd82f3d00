use beiramar_bucket::BucketError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Failure to obtain a table from the blob store.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to fetch {bucket}/{key}: {source}")]
    Fetch {
        bucket: String,
        key: String,
        #[source]
        source: BucketError,
    },
    #[error("malformed table in {location}: {source}")]
    Malformed {
        location: String,
        #[source]
        source: PolarsError,
    },
}

/// A normalization or classification step that cannot proceed. `operation`
/// is the label of the step that raised it.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("{operation}: column '{column}' not found")]
    MissingColumn {
        operation: &'static str,
        column: String,
    },
    #[error("{operation}: column '{column}' has type {dtype}, expected {expected}")]
    UnexpectedType {
        operation: &'static str,
        column: String,
        dtype: String,
        expected: &'static str,
    },
    #[error("{operation}: expected {expected} columns, found {found}")]
    ColumnCount {
        operation: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{operation}: duplicate column '{column}'")]
    DuplicateColumn {
        operation: &'static str,
        column: String,
    },
    #[error("{operation}: polars operation failed: {source}")]
    Polars {
        operation: &'static str,
        #[source]
        source: PolarsError,
    },
}

impl TransformError {
    pub(crate) fn polars(operation: &'static str) -> impl FnOnce(PolarsError) -> Self {
        move |source| Self::Polars { operation, source }
    }
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("{side} table is missing column '{column}'")]
    MissingColumn { side: &'static str, column: String },
    #[error("{side} column '{column}' has type {dtype}, expected a timestamp")]
    KeyType {
        side: &'static str,
        column: String,
        dtype: String,
    },
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to serialize table: {0}")]
    Serialize(#[from] PolarsError),
    #[error("failed to upload {bucket}/{key}: {source}")]
    Upload {
        bucket: String,
        key: String,
        #[source]
        source: BucketError,
    },
}

#[derive(Debug, Error)]
pub enum JobErrorKind {
    #[error(transparent)]
    SourceRead(#[from] ReadError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Join(#[from] JoinError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Job-level failure: the stage label plus the underlying error.
#[derive(Debug, Error)]
#[error("{stage} failed: {kind}")]
pub struct JobError {
    pub stage: &'static str,
    #[source]
    pub kind: JobErrorKind,
}

impl JobError {
    pub fn new(stage: &'static str, err: impl Into<JobErrorKind>) -> Self {
        Self {
            stage,
            kind: err.into(),
        }
    }
}
