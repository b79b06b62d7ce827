//! SpeedLeague backend: attempt submission, daily rate limiting, streaks and
//! a time-windowed global leaderboard.
//!
//! The ranking data lives in two places. Postgres holds the durable record
//! (users, every attempt, the per-day best ledger) and a Redis sorted set per
//! day serves rank lookups on the hot path. The sorted set is a disposable
//! projection of the ledger: when Redis is down or cold the same ranks are
//! recomputed straight from Postgres, and callers never see the difference.

pub mod config;
pub mod constants;
pub mod routes;
pub mod services;
pub mod storage;
pub mod store;

use std::sync::Arc;

use config::Config;
use services::leaderboard::Leaderboard;
use services::rate_limit::RateLimiter;
use services::verifier::IdentityVerifier;
use storage::Storage;
use store::FastPath;

pub struct AppState {
    pub docs: Arc<dyn Storage>,
    pub fast: Arc<FastPath>,
    pub verifier: IdentityVerifier,
    pub rate_limiter: RateLimiter,
    pub leaderboard: Leaderboard,
    pub config: Config,
}

impl AppState {
    pub fn new(
        docs: Arc<dyn Storage>,
        fast: Arc<FastPath>,
        verifier: IdentityVerifier,
        config: Config,
    ) -> Arc<Self> {
        let rate_limiter = RateLimiter::new(fast.clone(), docs.clone());
        let leaderboard = Leaderboard::new(fast.clone(), docs.clone());

        Arc::new(Self {
            docs,
            fast,
            verifier,
            rate_limiter,
            leaderboard,
            config,
        })
    }
}
