pub mod attempt;
pub mod auth;
pub mod leaderboard;
pub mod stats;
pub mod user;

use axum::Router;
use axum::routing::get;
use std::sync::Arc;

use crate::AppState;

/// Build all routes for the API
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(attempt::routes())
        .merge(auth::routes())
        .merge(leaderboard::routes())
        .merge(stats::routes())
        .merge(user::routes())
}

async fn health() -> &'static str {
    "ok"
}
