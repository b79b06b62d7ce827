//! Postgres-backed [`Storage`]
//!
//! Plain runtime queries with `query_as`, no compile-time checking, so the
//! crate builds without a live database. The daily-best upsert is the one
//! statement with concurrency teeth: the `WHERE best_ms > EXCLUDED.best_ms`
//! guard serializes racing improvements on the row itself.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{DailyBest, LeagueRow, NewAttempt, Storage, StorageResult, User};

const USER_COLUMNS: &str = "id, username, country, verified, identity_nullifier, \
     current_streak, longest_streak, last_played_day, total_attempts, \
     all_time_best_ms, preferences, created_at, last_active";

const BEST_COLUMNS: &str =
    "user_id, day, best_ms, attempts_used, global_rank, global_percentile";

pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn user(&self, id: &str) -> StorageResult<Option<User>> {
        let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: &User) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, country, verified, identity_nullifier,
                               current_streak, longest_streak, last_played_day,
                               total_attempts, all_time_best_ms, preferences,
                               created_at, last_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.country)
        .bind(user.verified)
        .bind(&user.identity_nullifier)
        .bind(user.current_streak)
        .bind(user.longest_streak)
        .bind(&user.last_played_day)
        .bind(user.total_attempts)
        .bind(user.all_time_best_ms)
        .bind(&user.preferences)
        .bind(user.created_at)
        .bind(user.last_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StorageResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET username = $2, country = $3, verified = $4, identity_nullifier = $5,
                current_streak = $6, longest_streak = $7, last_played_day = $8,
                total_attempts = $9, all_time_best_ms = $10, preferences = $11,
                last_active = $12
            WHERE id = $1
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.country)
        .bind(user.verified)
        .bind(&user.identity_nullifier)
        .bind(user.current_streak)
        .bind(user.longest_streak)
        .bind(&user.last_played_day)
        .bind(user.total_attempts)
        .bind(user.all_time_best_ms)
        .bind(&user.preferences)
        .bind(user.last_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let user = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_nullifier(&self, nullifier: &str) -> StorageResult<Option<User>> {
        let user = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE identity_nullifier = $1"
        ))
        .bind(nullifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn users_by_ids(&self, ids: &[String]) -> StorageResult<Vec<User>> {
        let users = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn insert_attempt(&self, attempt: &NewAttempt) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO attempts (user_id, day, attempt_number, reaction_ms,
                                  false_start, user_agent, client_timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&attempt.user_id)
        .bind(&attempt.day)
        .bind(attempt.attempt_number)
        .bind(attempt.reaction_ms)
        .bind(attempt.false_start)
        .bind(&attempt.user_agent)
        .bind(attempt.client_timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_attempts(&self, user_id: &str, day: &str) -> StorageResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE user_id = $1 AND day = $2")
                .bind(user_id)
                .bind(day)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn recent_reaction_times(
        &self,
        user_id: &str,
        day: &str,
        limit: i64,
    ) -> StorageResult<Vec<i32>> {
        let rows: Vec<(i32,)> = sqlx::query_as(
            r#"
            SELECT reaction_ms FROM attempts
            WHERE user_id = $1 AND day = $2 AND false_start = FALSE
            ORDER BY id DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(day)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        // Newest-first from the index scan; callers want chronological order.
        Ok(rows.into_iter().rev().map(|(ms,)| ms).collect())
    }

    async fn record_best(
        &self,
        user_id: &str,
        day: &str,
        reaction_ms: i32,
        attempt_number: i32,
    ) -> StorageResult<Option<DailyBest>> {
        let row = sqlx::query_as(&format!(
            r#"
            INSERT INTO daily_bests (user_id, day, best_ms, attempts_used)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, day) DO UPDATE
            SET best_ms = EXCLUDED.best_ms,
                attempts_used = EXCLUDED.attempts_used,
                updated_at = NOW()
            WHERE daily_bests.best_ms > EXCLUDED.best_ms
            RETURNING {BEST_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(day)
        .bind(reaction_ms)
        .bind(attempt_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn daily_best(&self, user_id: &str, day: &str) -> StorageResult<Option<DailyBest>> {
        let row = sqlx::query_as(&format!(
            "SELECT {BEST_COLUMNS} FROM daily_bests WHERE user_id = $1 AND day = $2"
        ))
        .bind(user_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn attach_rank_snapshot(
        &self,
        user_id: &str,
        day: &str,
        rank: i64,
        percentile: f64,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"
            UPDATE daily_bests
            SET global_rank = $3, global_percentile = $4, updated_at = NOW()
            WHERE user_id = $1 AND day = $2
            "#,
        )
        .bind(user_id)
        .bind(day)
        .bind(rank)
        .bind(percentile)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_better(&self, day: &str, best_ms: i32, user_id: &str) -> StorageResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM daily_bests
            WHERE day = $1
              AND (best_ms < $2 OR (best_ms = $2 AND user_id < $3))
            "#,
        )
        .bind(day)
        .bind(best_ms)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn day_entry_count(&self, day: &str) -> StorageResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM daily_bests WHERE day = $1")
            .bind(day)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn day_bests(&self, day: &str, limit: i64) -> StorageResult<Vec<DailyBest>> {
        let rows = sqlx::query_as(&format!(
            r#"
            SELECT {BEST_COLUMNS} FROM daily_bests
            WHERE day = $1
            ORDER BY best_ms, user_id
            LIMIT $2
            "#
        ))
        .bind(day)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn bests_since(&self, since: Option<&str>, limit: i64) -> StorageResult<Vec<DailyBest>> {
        let rows = match since {
            Some(since) => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {BEST_COLUMNS} FROM daily_bests
                    WHERE day >= $1
                    ORDER BY best_ms, user_id
                    LIMIT $2
                    "#
                ))
                .bind(since)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {BEST_COLUMNS} FROM daily_bests
                    ORDER BY best_ms, user_id
                    LIMIT $1
                    "#
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    async fn weekly_best(&self, user_id: &str, since: &str) -> StorageResult<Option<i32>> {
        let best: Option<i32> = sqlx::query_scalar(
            "SELECT MIN(best_ms) FROM daily_bests WHERE user_id = $1 AND day >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(best)
    }

    async fn league(&self, user_id: &str, week_start: &str) -> StorageResult<Option<LeagueRow>> {
        let row = sqlx::query_as(
            r#"
            SELECT user_id, week_start, tier, weekly_best_ms, games_played
            FROM leagues
            WHERE user_id = $1 AND week_start = $2
            "#,
        )
        .bind(user_id)
        .bind(week_start)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
