//! Per-user daily attempt limiting
//!
//! Usage is tracked by an atomic counter in the fast store keyed on
//! (user, day) with a calendar-day expiry. When the fast store is out, usage
//! is derived from the durably persisted attempts instead; a degraded store
//! must never make a user look like they have a fresh quota.

use std::sync::Arc;

use tracing::warn;

use crate::constants::{
    BASE_DAILY_ATTEMPTS, RATE_LIMIT_TTL_SECS, STREAK_BIG_BONUS_AT, STREAK_BONUS_AT,
};
use crate::storage::{Storage, StorageResult};
use crate::store::FastPath;

pub struct RateLimiter {
    fast: Arc<FastPath>,
    docs: Arc<dyn Storage>,
}

fn counter_key(user_id: &str, day: &str) -> String {
    format!("ratelimit:{user_id}:{day}")
}

impl RateLimiter {
    pub fn new(fast: Arc<FastPath>, docs: Arc<dyn Storage>) -> Self {
        Self { fast, docs }
    }

    /// Daily quota for a given streak. The thresholds select a tier, they do
    /// not stack: 3 base, 4 from a 3-day streak, 5 from a 7-day streak.
    pub fn quota(streak: i32) -> i64 {
        if streak >= STREAK_BIG_BONUS_AT {
            BASE_DAILY_ATTEMPTS + 2
        } else if streak >= STREAK_BONUS_AT {
            BASE_DAILY_ATTEMPTS + 1
        } else {
            BASE_DAILY_ATTEMPTS
        }
    }

    pub async fn attempts_used(&self, user_id: &str, day: &str) -> StorageResult<i64> {
        if let Some(value) = self.fast.get(&counter_key(user_id, day)).await {
            return Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0));
        }
        self.docs.count_attempts(user_id, day).await
    }

    pub async fn remaining(&self, user_id: &str, day: &str, streak: i32) -> StorageResult<i64> {
        let used = self.attempts_used(user_id, day).await?;
        Ok((Self::quota(streak) - used).max(0))
    }

    /// Atomically consume one slot and return the new count, which doubles as
    /// the attempt's sequence number for the day. The counter's expiry is set
    /// only by the increment that creates it.
    pub async fn increment(&self, user_id: &str, day: &str) -> StorageResult<i64> {
        let key = counter_key(user_id, day);
        if let Some(count) = self.fast.incr(&key).await {
            if count == 1 {
                self.fast.expire(&key, RATE_LIMIT_TTL_SECS).await;
            }
            return Ok(count);
        }

        warn!(user = %user_id, %day, "rate-limit counter unavailable, deriving count from stored attempts");
        Ok(self.docs.count_attempts(user_id, day).await? + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::store::MemoryStore;

    fn limiter() -> RateLimiter {
        RateLimiter::new(
            Arc::new(FastPath::new(Arc::new(MemoryStore::default()))),
            Arc::new(MemoryStorage::default()),
        )
    }

    #[test]
    fn quota_tiers() {
        assert_eq!(RateLimiter::quota(0), 3);
        assert_eq!(RateLimiter::quota(2), 3);
        assert_eq!(RateLimiter::quota(3), 4);
        assert_eq!(RateLimiter::quota(6), 4);
        assert_eq!(RateLimiter::quota(7), 5);
        assert_eq!(RateLimiter::quota(30), 5);
    }

    #[tokio::test]
    async fn remaining_decreases_and_resets_on_new_day() {
        let rl = limiter();
        let day = "2026-08-07";

        assert_eq!(rl.remaining("u1", day, 0).await.unwrap(), 3);
        let mut last = 3;
        for n in 1..=3 {
            assert_eq!(rl.increment("u1", day).await.unwrap(), n);
            let remaining = rl.remaining("u1", day, 0).await.unwrap();
            assert!(remaining < last);
            last = remaining;
        }
        assert_eq!(last, 0);

        // Over-consumption clamps at zero rather than going negative.
        rl.increment("u1", day).await.unwrap();
        assert_eq!(rl.remaining("u1", day, 0).await.unwrap(), 0);

        // A new day key starts from the full quota.
        assert_eq!(rl.remaining("u1", "2026-08-08", 0).await.unwrap(), 3);
        // Other users are unaffected.
        assert_eq!(rl.remaining("u2", day, 0).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn degraded_counter_falls_back_to_stored_attempts() {
        let docs = Arc::new(MemoryStorage::default());
        let rl = RateLimiter::new(Arc::new(FastPath::disabled()), docs.clone());
        let day = "2026-08-07";

        assert_eq!(rl.attempts_used("u1", day).await.unwrap(), 0);

        docs.insert_attempt(&crate::storage::NewAttempt {
            user_id: "u1".into(),
            day: day.into(),
            attempt_number: 1,
            reaction_ms: 220,
            false_start: false,
            user_agent: String::new(),
            client_timestamp: chrono::Utc::now(),
        })
        .await
        .unwrap();

        assert_eq!(rl.attempts_used("u1", day).await.unwrap(), 1);
        assert_eq!(rl.remaining("u1", day, 0).await.unwrap(), 2);
        // Sequence numbers keep advancing from the durable count.
        assert_eq!(rl.increment("u1", day).await.unwrap(), 2);
    }
}
