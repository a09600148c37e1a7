//! The single error boundary of the core: every public operation fails
//! with one of these kinds. Nothing else crosses the crate surface.

use thiserror::Error;

use crate::store::StoreError;
use pacer_contracts::TimestampError;
use pacer_course::GpxError;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing ids, malformed timestamps, empty fix lists, coordinates
    /// out of range. The request is rejected before any state changes.
    #[error("invalid request: {0}")]
    InvalidInput(String),

    /// Unknown event / event-detail, or a resource the read model does
    /// not know.
    #[error("not found: {0}")]
    NotFound(String),

    /// The uploaded or fetched GPX could not form a course.
    #[error("invalid gpx: {0}")]
    InvalidGpx(#[from] GpxError),

    /// The course could be neither served from cache nor materialised.
    #[error("course unavailable for {event_id}/{event_detail_id}: {reason}")]
    CourseUnavailable {
        event_id: String,
        event_detail_id: String,
        reason: String,
    },

    /// Live store or object store I/O failure that retries did not
    /// recover from.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Optimistic concurrency conflict that outlasted its retries.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request ran past its deadline; uncommitted writes were
    /// abandoned.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(key) => CoreError::Conflict(key),
            StoreError::Unavailable(msg) => CoreError::StoreUnavailable(msg),
            StoreError::Corrupt { key, source } => {
                CoreError::StoreUnavailable(format!("corrupt record at {key}: {source}"))
            }
        }
    }
}

impl From<TimestampError> for CoreError {
    fn from(e: TimestampError) -> Self {
        CoreError::InvalidInput(e.to_string())
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => CoreError::NotFound("row not found".to_string()),
            other => {
                tracing::error!(error = %other, "read model query failed");
                CoreError::StoreUnavailable(other.to_string())
            }
        }
    }
}
