use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

use crate::service::meter::MeterError;

/// Message raised by the booking overlap triggers in the schema.
pub(crate) const BOOKING_CONFLICT_SIGNAL: &str = "booking_conflict";

#[derive(Debug, ThisError)]
pub enum DeskError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{0}")]
    Conflict(String),

    #[error("booking overlaps {} existing booking(s)", .0.len())]
    BookingConflict(Vec<i64>),

    #[error("{0}")]
    InvalidState(String),

    #[error("Meter error: {0}")]
    Meter(#[from] MeterError),

    #[error("Database error: {0}")]
    Database(SqlxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl DeskError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::BookingConflict(_) => "BOOKING_CONFLICT",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Meter(_) => "INVALID_METER_READING",
            Self::Database(_) | Self::Io(_) | Self::Config(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Meter(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::BookingConflict(_) | Self::InvalidState(_) => {
                StatusCode::CONFLICT
            }
            Self::Database(_) | Self::Io(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<SqlxError> for DeskError {
    fn from(e: SqlxError) -> Self {
        if let SqlxError::Database(db_err) = &e {
            if db_err.message().contains(BOOKING_CONFLICT_SIGNAL) {
                return Self::Conflict("booking overlaps an existing booking".to_string());
            }
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("duplicate value: {}", db_err.message()));
            }
            if db_err.is_foreign_key_violation() {
                return Self::Validation("referenced record does not exist".to_string());
            }
        }
        Self::Database(e)
    }
}

impl From<figment::Error> for DeskError {
    fn from(e: figment::Error) -> Self {
        Self::Config(Box::new(e))
    }
}

impl IntoResponse for DeskError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "An internal server error occurred.".to_string()
        } else {
            self.to_string()
        };
        let conflicts = match &self {
            Self::BookingConflict(ids) => Some(ids.clone()),
            _ => None,
        };
        let body = ApiErrorResponse {
            error: message,
            code: self.code(),
            conflicts,
        };
        (status, Json(body)).into_response()
    }
}

/// Error body returned by every endpoint.
#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<Vec<i64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_of(err: DeskError) -> (StatusCode, Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn booking_conflict_lists_ids() {
        let (status, body) = body_of(DeskError::BookingConflict(vec![3, 7])).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "BOOKING_CONFLICT");
        assert_eq!(body["conflicts"], serde_json::json!([3, 7]));
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let (status, body) = body_of(DeskError::Database(SqlxError::PoolTimedOut)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(!body["error"].as_str().unwrap().contains("pool"));
        assert!(body.get("conflicts").is_none());
    }

    #[tokio::test]
    async fn io_errors_are_internal() {
        let err: DeskError =
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use").into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(!body["error"].as_str().unwrap().contains("address"));
    }

    #[tokio::test]
    async fn meter_errors_are_bad_requests() {
        let (status, body) = body_of(MeterError::SoloWithoutInstructor.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_METER_READING");
    }
}
