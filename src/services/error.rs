//! API error taxonomy
//!
//! One tagged error per rejection kind so clients can tell "fix your input"
//! from "try again tomorrow". Fast-store degradation never appears here; it
//! is absorbed by the durable fallback. Only durable-store failures surface
//! as the generic internal error.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use super::anti_cheat::Flag;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("missing required fields")]
    MissingFields,

    #[error("invalid attempt")]
    InvalidAttempt { flags: Vec<Flag> },

    #[error("daily attempt limit reached")]
    RateLimited,

    #[error("user not found")]
    UserNotFound,

    #[error("username already taken")]
    UsernameTaken,

    #[error("{0}")]
    VerificationFailed(String),

    #[error("internal error: {0}")]
    Storage(#[from] StorageError),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::MissingFields => "missing-fields",
            AppError::InvalidAttempt { .. } => "invalid-attempt",
            AppError::RateLimited => "rate-limited",
            AppError::UserNotFound => "not-found",
            AppError::UsernameTaken => "username-taken",
            AppError::VerificationFailed(_) => "verification-failed",
            AppError::Storage(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MissingFields
            | AppError::InvalidAttempt { .. }
            | AppError::UsernameTaken
            | AppError::VerificationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            AppError::InvalidAttempt { flags } => json!({
                "error": self.to_string(),
                "code": self.code(),
                "flags": flags,
            }),
            AppError::Storage(e) => {
                error!(error = %e, "request failed on durable store");
                json!({
                    "error": "internal server error",
                    "code": self.code(),
                })
            }
            _ => json!({
                "error": self.to_string(),
                "code": self.code(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
