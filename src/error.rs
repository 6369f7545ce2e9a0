use axum::http::StatusCode;
use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by tracking operations. All of them are reportable to
/// the caller; none should take the process down.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// The record or summary does not exist or belongs to someone else.
    #[error("not found")]
    NotFound,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    /// A record for the same user, date and slot already exists.
    #[error("a meal record already exists for this user, date and slot")]
    DuplicateRecord,
    #[error("insufficient data: need at least {required} data points, have {available}")]
    InsufficientData { required: usize, available: usize },
    #[error("version conflict: expected {expected}, current is {actual}")]
    ConflictingVersion { expected: i64, actual: i64 },
    #[error(transparent)]
    Storage(StoreError),
}

impl From<StoreError> for TrackingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => TrackingError::DuplicateRecord,
            other => TrackingError::Storage(other),
        }
    }
}

impl TrackingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TrackingError::NotFound => StatusCode::NOT_FOUND,
            TrackingError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            TrackingError::DuplicateRecord | TrackingError::ConflictingVersion { .. } => {
                StatusCode::CONFLICT
            }
            TrackingError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            TrackingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TrackingError> for (StatusCode, String) {
    fn from(e: TrackingError) -> Self {
        let status = e.status_code();
        if status.is_server_error() {
            tracing::error!(error = %e, "tracking operation failed");
        }
        (status, e.to_string())
    }
}
