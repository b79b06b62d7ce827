//! Profile and preferences endpoints

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::AppState;
use crate::services::error::AppError;
use crate::storage::{Storage, default_preferences};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/profile", post(update_profile))
        .route("/user/preferences", get(get_preferences).post(update_preferences))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileBody {
    user_id: Option<String>,
    username: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDto {
    id: String,
    username: String,
    country: Option<String>,
    is_verified: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    success: bool,
    user: ProfileDto,
}

/// POST /user/profile - Edit username and/or country
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ProfileBody>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user_id = body.user_id.ok_or(AppError::MissingFields)?;

    let mut user = state
        .docs
        .user(&user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    if let Some(username) = body.username {
        if let Some(existing) = state.docs.user_by_username(&username).await?
            && existing.id != user.id
        {
            return Err(AppError::UsernameTaken);
        }
        user.username = username;
    }

    if let Some(country) = body.country {
        user.country = Some(country);
    }

    user.last_active = Utc::now();
    state.docs.update_user(&user).await?;

    Ok(Json(ProfileResponse {
        success: true,
        user: ProfileDto {
            id: user.id,
            username: user.username,
            country: user.country,
            is_verified: user.verified,
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesQuery {
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesResponse {
    success: bool,
    preferences: Value,
}

/// GET /user/preferences?userId=...
async fn get_preferences(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreferencesQuery>,
) -> Result<Json<PreferencesResponse>, AppError> {
    let user_id = query.user_id.ok_or(AppError::MissingFields)?;

    let user = state
        .docs
        .user(&user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(Json(PreferencesResponse {
        success: true,
        preferences: with_defaults(user.preferences),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesBody {
    user_id: Option<String>,
    preferences: Option<Value>,
}

/// POST /user/preferences - Shallow-merge submitted keys over stored ones
async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PreferencesBody>,
) -> Result<Json<PreferencesResponse>, AppError> {
    let user_id = body.user_id.ok_or(AppError::MissingFields)?;
    let updates = body.preferences.ok_or(AppError::MissingFields)?;

    let mut user = state
        .docs
        .user(&user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    if let (Value::Object(stored), Value::Object(updates)) = (&mut user.preferences, updates) {
        for (key, value) in updates {
            stored.insert(key, value);
        }
    }

    state.docs.update_user(&user).await?;

    Ok(Json(PreferencesResponse {
        success: true,
        preferences: with_defaults(user.preferences),
    }))
}

/// Stored preferences may predate newer settings; defaults fill the gaps.
fn with_defaults(stored: Value) -> Value {
    let mut merged = default_preferences();
    if let (Value::Object(merged), Value::Object(stored)) = (&mut merged, stored) {
        for (key, value) in stored {
            merged.insert(key, value);
        }
    }
    merged
}
