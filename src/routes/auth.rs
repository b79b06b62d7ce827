//! Onboarding and identity verification endpoints

use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use crate::services::error::AppError;
use crate::services::verifier::ProofBundle;
use crate::storage::{Storage, User};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/guest", post(create_guest))
        .route("/auth/verify", post(verify_identity))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GuestResponse {
    success: bool,
    user_id: String,
    username: String,
    is_verified: bool,
}

/// POST /auth/guest - Create an unverified account so play can start
/// immediately
async fn create_guest(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GuestResponse>, AppError> {
    let now = Utc::now();
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    let id = format!("guest_{}_{}", now.timestamp_millis(), suffix);
    let username = format!("Guest{}", rand::rng().random_range(0..10_000));

    let user = User::new_guest(id, username, now);
    state.docs.create_user(&user).await?;

    Ok(Json(GuestResponse {
        success: true,
        user_id: user.id,
        username: user.username,
        is_verified: false,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyBody {
    proof: Option<String>,
    merkle_root: Option<String>,
    nullifier_hash: Option<String>,
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    success: bool,
    message: String,
}

/// POST /auth/verify - Attach a verified identity to an existing account
async fn verify_identity(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyBody>,
) -> Result<Json<VerifyResponse>, AppError> {
    let (Some(proof), Some(merkle_root), Some(nullifier_hash), Some(user_id)) = (
        body.proof,
        body.merkle_root,
        body.nullifier_hash,
        body.user_id,
    ) else {
        return Err(AppError::MissingFields);
    };

    let verdict = state
        .verifier
        .verify(&ProofBundle {
            proof,
            merkle_root,
            nullifier_hash: nullifier_hash.clone(),
        })
        .await;

    if !verdict.valid {
        return Err(AppError::VerificationFailed(
            verdict
                .reason
                .unwrap_or_else(|| "verification failed".to_string()),
        ));
    }

    // One human, one account: a nullifier seen on a different user means this
    // identity already verified elsewhere.
    if let Some(existing) = state.docs.user_by_nullifier(&nullifier_hash).await?
        && existing.id != user_id
    {
        return Err(AppError::VerificationFailed(
            "this identity is already verified with another account".to_string(),
        ));
    }

    let mut user = state
        .docs
        .user(&user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    user.identity_nullifier = Some(nullifier_hash);
    user.verified = true;
    user.last_active = Utc::now();
    state.docs.update_user(&user).await?;

    Ok(Json(VerifyResponse {
        success: true,
        message: "identity verified".to_string(),
    }))
}
