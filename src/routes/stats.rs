//! Per-user stats endpoint (GET /stats/{user_id})

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;
use crate::services::clock;
use crate::services::error::AppError;
use crate::services::league::tier_for_percentile;
use crate::storage::Storage;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/stats/{user_id}", get(get_stats))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    daily_best: Option<i32>,
    weekly_best: Option<i32>,
    current_league: Option<String>,
    current_streak: i32,
    longest_streak: i32,
    attempts_remaining: i64,
    all_time_best: Option<i32>,
    /// Countdown to the next UTC day boundary, e.g. "5h 12m".
    resets_in: String,
}

async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<StatsResponse>, AppError> {
    let user = state
        .docs
        .user(&user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let today = clock::current_day();
    let week_start = clock::week_start(None);

    let daily_best = state.docs.daily_best(&user_id, &today).await?;
    let weekly_best = state.docs.weekly_best(&user_id, &week_start).await?;

    // Prefer the maintained league row; fall back to classifying the user's
    // latest percentile snapshot when the projection has not caught up.
    let current_league = match state.docs.league(&user_id, &week_start).await? {
        Some(row) => Some(row.tier),
        None => daily_best
            .as_ref()
            .and_then(|b| b.global_percentile)
            .map(|p| tier_for_percentile(p).as_str().to_string()),
    };

    let attempts_remaining = state
        .rate_limiter
        .remaining(&user_id, &today, user.current_streak)
        .await?;

    Ok(Json(StatsResponse {
        daily_best: daily_best.map(|b| b.best_ms),
        weekly_best,
        current_league,
        current_streak: user.current_streak,
        longest_streak: user.longest_streak,
        attempts_remaining,
        all_time_best: user.all_time_best_ms,
        resets_in: clock::format_reset(clock::time_until_reset()),
    }))
}
