use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;
use thiserror::Error;

use crate::models::Envelope;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Connection(sqlx::Error),

    #[error("{0}")]
    Query(#[from] sqlx::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid JSON body: {0}")]
    InvalidBody(String),

    #[error("{1}")]
    BodyRejected(StatusCode, String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            AppError::BodyRejected(status, _) => *status,
            AppError::Config(_)
            | AppError::Connection(_)
            | AppError::Query(_)
            | AppError::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::Config(msg) => tracing::error!(problem = %msg, "configuration error"),
            AppError::Connection(e) => tracing::error!(error = ?e, "database connection error"),
            AppError::Query(e) => tracing::error!(error = ?e, "database query error"),
            AppError::Timeout(after) => tracing::error!(after = ?after, "database operation timed out"),
            AppError::Validation(msg) | AppError::InvalidBody(msg) => {
                tracing::warn!(reason = %msg, "rejected request")
            }
            AppError::BodyRejected(status, msg) => {
                tracing::warn!(status = status.as_u16(), reason = %msg, "request body rejected")
            }
        }

        (status, Json(Envelope::error(self.to_string()))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_is_client_error() {
        let (status, body) = render(AppError::Validation("Name is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"status": "error", "message": "Name is required"}));
    }

    #[tokio::test]
    async fn test_invalid_body_is_client_error() {
        let (status, body) = render(AppError::InvalidBody("expected value".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid JSON body: expected value");
    }

    #[tokio::test]
    async fn test_body_rejection_keeps_status_in_envelope() {
        let err =
            AppError::BodyRejected(StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded".into());
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, json!({"status": "error", "message": "length limit exceeded"}));
    }

    #[tokio::test]
    async fn test_connection_error_carries_driver_message() {
        let (status, body) = render(AppError::Connection(sqlx::Error::PoolTimedOut)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], sqlx::Error::PoolTimedOut.to_string());
    }

    #[tokio::test]
    async fn test_query_error_from_sqlx() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_config_and_timeout_are_server_errors() {
        let (status, body) = render(AppError::Config("DB_USER must be set".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Configuration error: DB_USER must be set");

        let (status, _) = render(AppError::Timeout(Duration::from_secs(3))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
