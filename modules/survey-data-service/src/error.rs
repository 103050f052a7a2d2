//! Error types for the store and the record gateway.

use survey_data_types::RecordField;
use thiserror::Error;

/// Failures raised by a `RecordStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to encode query parameter: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("database lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced by the gateway to the HTTP layer.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Any store failure, tagged with the gateway operation that hit it.
    #[error("store failure during {operation}: {source}")]
    StoreFailure {
        operation: &'static str,
        source: StoreError,
    },
    /// A record value outside its field's declared domain.
    #[error("invalid value {value:?} for field {field}")]
    ValidationFailure { field: RecordField, value: String },
}

pub type GatewayResult<T> = Result<T, GatewayError>;
