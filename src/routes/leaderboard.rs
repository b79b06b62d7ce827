//! Leaderboard query endpoint (GET /leaderboard)

use axum::{Json, Router, extract::Query, extract::State, routing::get};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::AppState;
use crate::constants::{
    CONTEXT_NEIGHBORS, CONTEXT_SCAN_LIMIT, DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT,
};
use crate::services::clock;
use crate::services::error::AppError;
use crate::services::leaderboard::TopEntry;
use crate::storage::{Storage, User};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/leaderboard", get(get_leaderboard))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeaderboardParams {
    period: Option<String>,
    limit: Option<i64>,
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryDto {
    user_id: String,
    rank: i64,
    reaction_ms: i32,
    country: Option<String>,
    is_verified: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LeaderboardResponse {
    entries: Vec<EntryDto>,
    total_players: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_rank: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_percentile: Option<f64>,
}

async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let period = params.period.as_deref().unwrap_or("today");
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT);

    match period {
        "week" | "alltime" => windowed(&state, period, limit, params.user_id.as_deref()).await,
        _ => today(&state, limit, params.user_id.as_deref()).await,
    }
}

/// Today's board comes from the leaderboard store (fast path when healthy,
/// ledger recompute otherwise). A viewer outside the returned window gets a
/// slice of the board centered on their own rank instead.
async fn today(
    state: &AppState,
    limit: i64,
    viewer: Option<&str>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let day = clock::current_day();
    let mut entries = state.leaderboard.top(&day, limit).await?;

    let mut user_rank = None;
    let mut user_percentile = None;

    if let Some(viewer) = viewer {
        let info = state.leaderboard.rank(&day, viewer).await?;
        if let Some(rank) = info.rank {
            user_rank = Some(rank);
            user_percentile = Some(info.percentile);

            if !entries.iter().any(|e| e.user_id == viewer) {
                let scan = state.leaderboard.top(&day, CONTEXT_SCAN_LIMIT).await?;
                if let Some(pos) = scan.iter().position(|e| e.user_id == viewer) {
                    let start = pos.saturating_sub(CONTEXT_NEIGHBORS);
                    let end = (pos + CONTEXT_NEIGHBORS + 1).min(scan.len());
                    entries = scan[start..end].to_vec();
                }
            }
        }
    }

    let total_players = entries.len() as i64;
    let entries = join_profiles(state, entries).await?;

    Ok(Json(LeaderboardResponse {
        entries,
        total_players,
        user_rank,
        user_percentile,
    }))
}

/// Week and all-time boards rank ledger rows directly. The percentile here is
/// the rank-based metric over the returned window, a deliberately separate
/// number from the today-board percentile.
async fn windowed(
    state: &AppState,
    period: &str,
    limit: i64,
    viewer: Option<&str>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let since = match period {
        "week" => Some(clock::day_key(
            Utc::now().date_naive() - Duration::days(7),
        )),
        _ => None,
    };

    let rows = state.docs.bests_since(since.as_deref(), limit).await?;
    let total_players = rows.len() as i64;

    let entries: Vec<TopEntry> = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| TopEntry {
            user_id: row.user_id,
            reaction_ms: row.best_ms,
            rank: i as i64 + 1,
        })
        .collect();

    let mut user_rank = None;
    let mut user_percentile = None;
    if let Some(viewer) = viewer
        && let Some(entry) = entries.iter().find(|e| e.user_id == viewer)
    {
        user_rank = Some(entry.rank);
        let raw = (total_players - entry.rank + 1) as f64 / total_players as f64 * 100.0;
        user_percentile = Some((raw * 10.0).round() / 10.0);
    }

    let entries = join_profiles(state, entries).await?;

    Ok(Json(LeaderboardResponse {
        entries,
        total_players,
        user_rank,
        user_percentile,
    }))
}

async fn join_profiles(
    state: &AppState,
    entries: Vec<TopEntry>,
) -> Result<Vec<EntryDto>, AppError> {
    let ids: Vec<String> = entries.iter().map(|e| e.user_id.clone()).collect();
    let users: HashMap<String, User> = state
        .docs
        .users_by_ids(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();

    Ok(entries
        .into_iter()
        .map(|entry| {
            let user = users.get(&entry.user_id);
            EntryDto {
                rank: entry.rank,
                reaction_ms: entry.reaction_ms,
                country: user.and_then(|u| u.country.clone()),
                is_verified: user.is_some_and(|u| u.verified),
                user_id: entry.user_id,
            }
        })
        .collect())
}
