use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy for the API.
///
/// Every variant maps to a status code plus the `{"error": "..."}` body the
/// frontend expects. Client errors (bad input, double logging, missing
/// records) carry their message through; server faults log the detail and
/// return a generic body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Habit not found")]
    HabitNotFound,

    #[error("Accountability partner not found")]
    PartnerNotFound,

    #[error("Habit already logged today")]
    AlreadyLogged,

    /// A stored habit carries a recurrence rule we cannot parse. Data
    /// corruption or a missed migration, never defaulted to a guessed rule.
    #[error("Invalid recurrence rule")]
    Configuration(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("{0}")]
    Validation(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::HabitNotFound | ApiError::PartnerNotFound => StatusCode::NOT_FOUND,
            ApiError::AlreadyLogged
            | ApiError::InvalidCredentials
            | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::Configuration(detail) => {
                tracing::error!("❌ Bad recurrence rule on stored habit: {}", detail);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Database(e) => {
                tracing::error!("❌ DB error: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Internal(detail) => {
                tracing::error!("❌ Internal error: {}", detail);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
