use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use speedleague::config::Config;
use speedleague::services::clock;
use speedleague::services::verifier::IdentityVerifier;
use speedleague::storage::PgStorage;
use speedleague::store::{FastPath, RedisStore};
use speedleague::{AppState, routes};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,speedleague=debug")),
        )
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    let fast = match &config.redis_url {
        Some(url) => match RedisStore::connect(url).await {
            Ok(store) => Arc::new(FastPath::new(Arc::new(store))),
            Err(e) => {
                warn!(error = %e, "fast store unreachable at startup, serving from durable fallback");
                Arc::new(FastPath::disabled())
            }
        },
        None => Arc::new(FastPath::disabled()),
    };

    let verifier = IdentityVerifier::new(
        config.verifier_url.clone(),
        config.verifier_action.clone(),
    );

    let port = config.port;
    let state = AppState::new(Arc::new(PgStorage::new(pool)), fast, verifier, config);

    // Seed today's sorted set from the ledger so fast-path ranks match the
    // durable truth from the first request, then keep probing for recovery.
    tokio::spawn(fast_store_probe(state.clone()));

    let app = routes::build_routes()
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    info!("listening on http://{addr}");
    axum::serve(listener, app).await.expect("Server failed");
}

async fn fast_store_probe(state: Arc<AppState>) {
    if state.fast.available() {
        rebuild_today(&state).await;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(30));
    interval.tick().await;
    loop {
        interval.tick().await;
        if state.fast.available() {
            continue;
        }
        if state.fast.health_check().await {
            info!("fast store recovered");
            rebuild_today(&state).await;
        }
    }
}

async fn rebuild_today(state: &AppState) {
    let day = clock::current_day();
    if let Err(e) = state.leaderboard.rebuild(&day).await {
        warn!(%day, error = %e, "leaderboard rebuild failed");
    }
}
