//! Durable document store
//!
//! [`Storage`] is the contract the core needs from persistence: keyed reads,
//! filtered finds with sort and limit, creates, updates by key and filtered
//! counts. No cross-collection transactions are assumed. [`PgStorage`] is the
//! production backend; [`memory::MemoryStorage`] backs the test suite.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use thiserror::Error;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub country: Option<String>,
    pub verified: bool,
    /// Nullifier from the identity proof; unique per human, prevents one
    /// identity from verifying multiple accounts.
    pub identity_nullifier: Option<String>,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_played_day: Option<String>,
    pub total_attempts: i64,
    pub all_time_best_ms: Option<i32>,
    pub preferences: Value,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl User {
    pub fn new_guest(id: String, username: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username,
            country: None,
            verified: false,
            identity_nullifier: None,
            current_streak: 0,
            longest_streak: 0,
            last_played_day: None,
            total_attempts: 0,
            all_time_best_ms: None,
            preferences: default_preferences(),
            created_at: now,
            last_active: now,
        }
    }
}

pub fn default_preferences() -> Value {
    json!({
        "soundEnabled": true,
        "theme": "auto",
        "notifications": true,
    })
}

/// Immutable historical record of one submission. False starts are stored
/// with the zero sentinel.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: String,
    pub day: String,
    pub attempt_number: i32,
    pub reaction_ms: i32,
    pub false_start: bool,
    pub user_agent: String,
    pub client_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyBest {
    pub user_id: String,
    pub day: String,
    pub best_ms: i32,
    pub attempts_used: i32,
    pub global_rank: Option<i64>,
    pub global_percentile: Option<f64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeagueRow {
    pub user_id: String,
    pub week_start: String,
    pub tier: String,
    pub weekly_best_ms: Option<i32>,
    pub games_played: i32,
}

#[async_trait]
pub trait Storage: Send + Sync {
    // --- users ---

    async fn user(&self, id: &str) -> StorageResult<Option<User>>;

    async fn create_user(&self, user: &User) -> StorageResult<()>;

    /// Full-row update by key.
    async fn update_user(&self, user: &User) -> StorageResult<()>;

    async fn user_by_username(&self, username: &str) -> StorageResult<Option<User>>;

    async fn user_by_nullifier(&self, nullifier: &str) -> StorageResult<Option<User>>;

    async fn users_by_ids(&self, ids: &[String]) -> StorageResult<Vec<User>>;

    // --- attempts ---

    async fn insert_attempt(&self, attempt: &NewAttempt) -> StorageResult<()>;

    async fn count_attempts(&self, user_id: &str, day: &str) -> StorageResult<i64>;

    /// Reaction times of the user's most recent non-false-start attempts for
    /// the day, oldest first.
    async fn recent_reaction_times(
        &self,
        user_id: &str,
        day: &str,
        limit: i64,
    ) -> StorageResult<Vec<i32>>;

    // --- daily best ledger ---

    /// Create the (user, day) row or improve it when `reaction_ms` is
    /// strictly better. Returns the written row when this attempt set a new
    /// daily best (first of the day counts), `None` on tie or worse. Racing
    /// calls for one user serialize on the stored value; a worse score can
    /// never overwrite a better one.
    async fn record_best(
        &self,
        user_id: &str,
        day: &str,
        reaction_ms: i32,
        attempt_number: i32,
    ) -> StorageResult<Option<DailyBest>>;

    async fn daily_best(&self, user_id: &str, day: &str) -> StorageResult<Option<DailyBest>>;

    /// Denormalized rank snapshot for quick stats reads. Best effort, not
    /// authoritative.
    async fn attach_rank_snapshot(
        &self,
        user_id: &str,
        day: &str,
        rank: i64,
        percentile: f64,
    ) -> StorageResult<()>;

    /// Ledger rows strictly ahead of (`best_ms`, `user_id`) for the day.
    /// The user-id tiebreak matches sorted-set member order so durable ranks
    /// agree with the fast path even on equal scores.
    async fn count_better(&self, day: &str, best_ms: i32, user_id: &str) -> StorageResult<i64>;

    async fn day_entry_count(&self, day: &str) -> StorageResult<i64>;

    /// The day's ledger ordered ascending by (best_ms, user_id).
    async fn day_bests(&self, day: &str, limit: i64) -> StorageResult<Vec<DailyBest>>;

    /// Ledger rows with `day >= since` (all rows when `since` is `None`),
    /// ordered ascending by (best_ms, user_id).
    async fn bests_since(&self, since: Option<&str>, limit: i64) -> StorageResult<Vec<DailyBest>>;

    async fn weekly_best(&self, user_id: &str, since: &str) -> StorageResult<Option<i32>>;

    // --- league projection (read-only here) ---

    async fn league(&self, user_id: &str, week_start: &str) -> StorageResult<Option<LeagueRow>>;
}
