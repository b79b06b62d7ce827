//! Per-day global leaderboard with a fast path and a durable fallback
//!
//! One abstraction, two interchangeable strategies. The fast path keeps a
//! sorted set per day (score = best reaction time, lower ranks first). The
//! fallback re-derives the exact same ranks from the daily-best ledger:
//! entries strictly ahead of yours plus one, with a user-id tiebreak matching
//! sorted-set member order. Selection happens in here off the health flag;
//! callers never know which path answered.
//!
//! Only daily-best improvements are ever upserted, so the set stays a pure
//! best-of projection that can be rebuilt from the ledger at any time.

use std::sync::Arc;

use tracing::warn;

use crate::constants::LEADERBOARD_TTL_SECS;
use crate::storage::{Storage, StorageResult};
use crate::store::FastPath;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankInfo {
    /// 1-indexed; `None` when the user has no entry for the day.
    pub rank: Option<i64>,
    pub percentile: f64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopEntry {
    pub user_id: String,
    pub reaction_ms: i32,
    pub rank: i64,
}

pub struct Leaderboard {
    fast: Arc<FastPath>,
    docs: Arc<dyn Storage>,
}

fn board_key(day: &str) -> String {
    format!("leaderboard:global:{day}")
}

/// Share of the field a 1-indexed rank beats, as 0..=100 with one decimal.
pub fn percentile(rank: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let raw = (total - rank) as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

impl Leaderboard {
    pub fn new(fast: Arc<FastPath>, docs: Arc<dyn Storage>) -> Self {
        Self { fast, docs }
    }

    /// Record a daily-best score. On the fast path this refreshes the day
    /// key's expiry as well; with the fast store down there is nothing to do,
    /// the ledger row already carries the score for the fallback.
    pub async fn upsert(&self, day: &str, user_id: &str, reaction_ms: i32) {
        let key = board_key(day);
        if self
            .fast
            .zadd(&key, user_id, reaction_ms as i64)
            .await
            .is_some()
        {
            self.fast.expire(&key, LEADERBOARD_TTL_SECS).await;
        }
    }

    pub async fn rank(&self, day: &str, user_id: &str) -> StorageResult<RankInfo> {
        let key = board_key(day);

        match self.fast.zrank(&key, user_id).await {
            Some(Some(rank0)) => {
                if let Some(total) = self.fast.zcard(&key).await {
                    let rank = rank0 + 1;
                    return Ok(RankInfo {
                        rank: Some(rank),
                        percentile: percentile(rank, total),
                        total,
                    });
                }
            }
            Some(None) => {
                if let Some(total) = self.fast.zcard(&key).await {
                    return Ok(RankInfo {
                        rank: None,
                        percentile: 0.0,
                        total,
                    });
                }
            }
            None => {}
        }

        self.rank_from_ledger(day, user_id).await
    }

    pub async fn top(&self, day: &str, limit: i64) -> StorageResult<Vec<TopEntry>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        if let Some(entries) = self
            .fast
            .zrange_with_scores(&board_key(day), 0, limit - 1)
            .await
        {
            return Ok(entries
                .into_iter()
                .enumerate()
                .map(|(i, (user_id, score))| TopEntry {
                    user_id,
                    reaction_ms: score as i32,
                    rank: i as i64 + 1,
                })
                .collect());
        }

        let rows = self.docs.day_bests(day, limit).await?;
        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| TopEntry {
                user_id: row.user_id,
                reaction_ms: row.best_ms,
                rank: i as i64 + 1,
            })
            .collect())
    }

    /// Repopulate the day's sorted set from the ledger. Run after the fast
    /// store comes back so ranks served from it match the durable truth.
    pub async fn rebuild(&self, day: &str) -> StorageResult<()> {
        let rows = self.docs.day_bests(day, i64::from(i32::MAX)).await?;
        if rows.is_empty() {
            return Ok(());
        }

        let key = board_key(day);
        for row in &rows {
            if self
                .fast
                .zadd(&key, &row.user_id, row.best_ms as i64)
                .await
                .is_none()
            {
                warn!(%day, "leaderboard rebuild aborted, fast store went away");
                return Ok(());
            }
        }
        self.fast.expire(&key, LEADERBOARD_TTL_SECS).await;
        Ok(())
    }

    async fn rank_from_ledger(&self, day: &str, user_id: &str) -> StorageResult<RankInfo> {
        let total = self.docs.day_entry_count(day).await?;

        let Some(best) = self.docs.daily_best(user_id, day).await? else {
            return Ok(RankInfo {
                rank: None,
                percentile: 0.0,
                total,
            });
        };

        let rank = self.docs.count_better(day, best.best_ms, user_id).await? + 1;
        Ok(RankInfo {
            rank: Some(rank),
            percentile: percentile(rank, total),
            total,
        })
    }
}
