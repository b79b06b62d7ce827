//! Attempt submission endpoint (POST /attempt)

use axum::{Json, Router, extract::State, routing::post};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use crate::services::error::AppError;
use crate::services::submission::{self, SubmissionOutcome, SubmissionRequest};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/attempt", post(submit_attempt))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttemptBody {
    user_id: Option<String>,
    reaction_ms: Option<i32>,
    #[serde(default)]
    is_false_start: bool,
    /// Client-observed submission time, ISO-8601.
    timestamp: Option<String>,
    device_info: Option<DeviceInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceInfo {
    user_agent: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AttemptResponse {
    success: bool,
    attempt_saved: bool,
    is_daily_best: bool,
    current_percentile: f64,
    rank: i64,
    attempts_remaining: i64,
}

async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AttemptBody>,
) -> Result<Json<AttemptResponse>, AppError> {
    let (Some(user_id), Some(reaction_ms), Some(timestamp)) =
        (body.user_id, body.reaction_ms, body.timestamp)
    else {
        return Err(AppError::MissingFields);
    };

    // An unparseable timestamp is malformed input, not a validation verdict.
    let submitted_at = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|_| AppError::MissingFields)?
        .to_utc();

    let user_agent = body
        .device_info
        .and_then(|d| d.user_agent)
        .unwrap_or_default();

    let outcome = submission::submit(
        &state,
        SubmissionRequest {
            user_id,
            reaction_ms,
            is_false_start: body.is_false_start,
            submitted_at,
            user_agent,
        },
    )
    .await?;

    match outcome {
        SubmissionOutcome::Completed(done) => Ok(Json(AttemptResponse {
            success: true,
            attempt_saved: done.attempt_saved,
            is_daily_best: done.is_daily_best,
            current_percentile: done.percentile,
            rank: done.rank,
            attempts_remaining: done.attempts_remaining,
        })),
        SubmissionOutcome::RateLimited => Err(AppError::RateLimited),
        SubmissionOutcome::Rejected { flags } => Err(AppError::InvalidAttempt { flags }),
    }
}
