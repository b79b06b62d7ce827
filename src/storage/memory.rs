//! In-memory [`Storage`] for tests and store-less local runs
//!
//! One mutex over all collections; every operation is a serialized
//! read-modify-write, which trivially satisfies the daily-best upsert's
//! atomicity contract.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{DailyBest, LeagueRow, NewAttempt, Storage, StorageResult, User};

#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    attempts: Vec<NewAttempt>,
    // (user_id, day) -> row
    bests: HashMap<(String, String), DailyBest>,
    leagues: HashMap<(String, String), LeagueRow>,
}

impl MemoryStorage {
    /// Seed a league row; the projection is read-only for the core.
    pub fn put_league(&self, row: LeagueRow) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .leagues
            .insert((row.user_id.clone(), row.week_start.clone()), row);
    }
}

fn sorted_bests<'a>(bests: impl Iterator<Item = &'a DailyBest>, limit: i64) -> Vec<DailyBest> {
    let mut rows: Vec<DailyBest> = bests.cloned().collect();
    rows.sort_by(|a, b| (a.best_ms, &a.user_id).cmp(&(b.best_ms, &b.user_id)));
    rows.truncate(limit.max(0) as usize);
    rows
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn user(&self, id: &str) -> StorageResult<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.get(id).cloned())
    }

    async fn create_user(&self, user: &User) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn user_by_nullifier(&self, nullifier: &str) -> StorageResult<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .values()
            .find(|u| u.identity_nullifier.as_deref() == Some(nullifier))
            .cloned())
    }

    async fn users_by_ids(&self, ids: &[String]) -> StorageResult<Vec<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| inner.users.get(id).cloned())
            .collect())
    }

    async fn insert_attempt(&self, attempt: &NewAttempt) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.attempts.push(attempt.clone());
        Ok(())
    }

    async fn count_attempts(&self, user_id: &str, day: &str) -> StorageResult<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.day == day)
            .count() as i64)
    }

    async fn recent_reaction_times(
        &self,
        user_id: &str,
        day: &str,
        limit: i64,
    ) -> StorageResult<Vec<i32>> {
        let inner = self.inner.lock().unwrap();
        let mut times: Vec<i32> = inner
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.day == day && !a.false_start)
            .map(|a| a.reaction_ms)
            .collect();
        let keep = (limit.max(0) as usize).min(times.len());
        times = times.split_off(times.len() - keep);
        Ok(times)
    }

    async fn record_best(
        &self,
        user_id: &str,
        day: &str,
        reaction_ms: i32,
        attempt_number: i32,
    ) -> StorageResult<Option<DailyBest>> {
        let mut inner = self.inner.lock().unwrap();
        let key = (user_id.to_string(), day.to_string());

        match inner.bests.get_mut(&key) {
            None => {
                let row = DailyBest {
                    user_id: user_id.to_string(),
                    day: day.to_string(),
                    best_ms: reaction_ms,
                    attempts_used: attempt_number,
                    global_rank: None,
                    global_percentile: None,
                };
                inner.bests.insert(key, row.clone());
                Ok(Some(row))
            }
            Some(row) if row.best_ms > reaction_ms => {
                row.best_ms = reaction_ms;
                row.attempts_used = attempt_number;
                Ok(Some(row.clone()))
            }
            Some(_) => Ok(None),
        }
    }

    async fn daily_best(&self, user_id: &str, day: &str) -> StorageResult<Option<DailyBest>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .bests
            .get(&(user_id.to_string(), day.to_string()))
            .cloned())
    }

    async fn attach_rank_snapshot(
        &self,
        user_id: &str,
        day: &str,
        rank: i64,
        percentile: f64,
    ) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(row) = inner.bests.get_mut(&(user_id.to_string(), day.to_string())) {
            row.global_rank = Some(rank);
            row.global_percentile = Some(percentile);
        }
        Ok(())
    }

    async fn count_better(&self, day: &str, best_ms: i32, user_id: &str) -> StorageResult<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .bests
            .values()
            .filter(|b| b.day == day)
            .filter(|b| {
                b.best_ms < best_ms || (b.best_ms == best_ms && b.user_id.as_str() < user_id)
            })
            .count() as i64)
    }

    async fn day_entry_count(&self, day: &str) -> StorageResult<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.bests.values().filter(|b| b.day == day).count() as i64)
    }

    async fn day_bests(&self, day: &str, limit: i64) -> StorageResult<Vec<DailyBest>> {
        let inner = self.inner.lock().unwrap();
        Ok(sorted_bests(
            inner.bests.values().filter(|b| b.day == day),
            limit,
        ))
    }

    async fn bests_since(&self, since: Option<&str>, limit: i64) -> StorageResult<Vec<DailyBest>> {
        let inner = self.inner.lock().unwrap();
        Ok(sorted_bests(
            inner
                .bests
                .values()
                .filter(|b| since.is_none_or(|s| b.day.as_str() >= s)),
            limit,
        ))
    }

    async fn weekly_best(&self, user_id: &str, since: &str) -> StorageResult<Option<i32>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .bests
            .values()
            .filter(|b| b.user_id == user_id && b.day.as_str() >= since)
            .map(|b| b.best_ms)
            .min())
    }

    async fn league(&self, user_id: &str, week_start: &str) -> StorageResult<Option<LeagueRow>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .leagues
            .get(&(user_id.to_string(), week_start.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_best_is_strictly_monotonic() {
        let docs = MemoryStorage::default();

        let first = docs.record_best("u1", "2026-08-07", 220, 1).await.unwrap();
        assert_eq!(first.unwrap().best_ms, 220);

        let improved = docs.record_best("u1", "2026-08-07", 190, 2).await.unwrap();
        assert_eq!(improved.as_ref().unwrap().best_ms, 190);
        assert_eq!(improved.unwrap().attempts_used, 2);

        // Ties and regressions leave the row untouched.
        assert!(docs.record_best("u1", "2026-08-07", 190, 3).await.unwrap().is_none());
        assert!(docs.record_best("u1", "2026-08-07", 205, 4).await.unwrap().is_none());

        let row = docs.daily_best("u1", "2026-08-07").await.unwrap().unwrap();
        assert_eq!(row.best_ms, 190);
        assert_eq!(row.attempts_used, 2);
    }

    #[tokio::test]
    async fn count_better_breaks_ties_by_user_id() {
        let docs = MemoryStorage::default();
        docs.record_best("alice", "2026-08-07", 190, 1).await.unwrap();
        docs.record_best("bob", "2026-08-07", 190, 1).await.unwrap();
        docs.record_best("carol", "2026-08-07", 180, 1).await.unwrap();

        assert_eq!(docs.count_better("2026-08-07", 180, "carol").await.unwrap(), 0);
        assert_eq!(docs.count_better("2026-08-07", 190, "alice").await.unwrap(), 1);
        assert_eq!(docs.count_better("2026-08-07", 190, "bob").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn weekly_best_is_min_since_week_start() {
        let docs = MemoryStorage::default();
        docs.record_best("u1", "2026-08-03", 240, 1).await.unwrap();
        docs.record_best("u1", "2026-08-05", 210, 1).await.unwrap();
        // Previous week, out of window.
        docs.record_best("u1", "2026-07-30", 150, 1).await.unwrap();

        assert_eq!(docs.weekly_best("u1", "2026-08-03").await.unwrap(), Some(210));
        assert_eq!(docs.weekly_best("u2", "2026-08-03").await.unwrap(), None);
    }

    #[tokio::test]
    async fn league_rows_are_read_back() {
        let docs = MemoryStorage::default();
        docs.put_league(LeagueRow {
            user_id: "u1".into(),
            week_start: "2026-08-03".into(),
            tier: "Gold".into(),
            weekly_best_ms: Some(190),
            games_played: 4,
        });

        let row = docs.league("u1", "2026-08-03").await.unwrap().unwrap();
        assert_eq!(row.tier, "Gold");
        assert!(docs.league("u1", "2026-07-27").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recent_reaction_times_skips_false_starts() {
        let docs = MemoryStorage::default();
        for (n, (ms, fs)) in [(220, false), (0, true), (190, false)].iter().enumerate() {
            docs.insert_attempt(&NewAttempt {
                user_id: "u1".into(),
                day: "2026-08-07".into(),
                attempt_number: n as i32 + 1,
                reaction_ms: *ms,
                false_start: *fs,
                user_agent: String::new(),
                client_timestamp: chrono::Utc::now(),
            })
            .await
            .unwrap();
        }

        assert_eq!(
            docs.recent_reaction_times("u1", "2026-08-07", 10).await.unwrap(),
            vec![220, 190]
        );
        assert_eq!(
            docs.recent_reaction_times("u1", "2026-08-07", 1).await.unwrap(),
            vec![190]
        );
        assert_eq!(docs.count_attempts("u1", "2026-08-07").await.unwrap(), 3);
    }
}
