//! Fast key-value / sorted-set store
//!
//! [`FastStore`] is the contract the ranking hot path needs: per-day sorted
//! sets (lower score ranks first) plus atomic counters with expiry. The
//! production backend is Redis; [`memory::MemoryStore`] is a drop-in twin for
//! tests and store-less local runs.
//!
//! [`FastPath`] wraps a store with a circuit-style availability flag. Any
//! command failure marks the path unavailable and is reported to callers as
//! absence rather than an error, so they route to the durable fallback
//! without branching on store internals. A background probe may call
//! [`FastPath::health_check`] to close the circuit again.

pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

pub use memory::MemoryStore;
pub use redis::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait FastStore: Send + Sync {
    /// Insert or overwrite `member` with `score` in the sorted set at `key`.
    async fn zadd(&self, key: &str, member: &str, score: i64) -> StoreResult<()>;

    /// 0-indexed rank of `member`, ascending by (score, member).
    async fn zrank(&self, key: &str, member: &str) -> StoreResult<Option<i64>>;

    async fn zcard(&self, key: &str) -> StoreResult<i64>;

    /// Members with scores for the index range `[start, stop]`, inclusive.
    async fn zrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<(String, i64)>>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Atomic increment-and-read. The one operation in the system where a
    /// read-modify-write race is unacceptable.
    async fn incr(&self, key: &str) -> StoreResult<i64>;

    async fn expire(&self, key: &str, seconds: i64) -> StoreResult<()>;

    async fn ping(&self) -> StoreResult<()>;
}

/// Health-tracking wrapper around a [`FastStore`].
///
/// Every accessor returns `None` when the path is disabled, the circuit is
/// open, or the underlying command failed (which also opens the circuit).
/// `Some(value)` always means the fast store answered.
pub struct FastPath {
    store: Option<Arc<dyn FastStore>>,
    available: AtomicBool,
}

impl FastPath {
    pub fn new(store: Arc<dyn FastStore>) -> Self {
        Self {
            store: Some(store),
            available: AtomicBool::new(true),
        }
    }

    /// A path with no backing store; every accessor reports unavailable.
    pub fn disabled() -> Self {
        Self {
            store: None,
            available: AtomicBool::new(false),
        }
    }

    pub fn available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    fn active_store(&self) -> Option<&Arc<dyn FastStore>> {
        if !self.available() {
            return None;
        }
        self.store.as_ref()
    }

    fn degrade(&self, op: &str, err: StoreError) {
        self.available.store(false, Ordering::Relaxed);
        warn!(%op, error = %err, "fast store command failed, switching to durable fallback");
    }

    /// Ping the store and close the circuit on success. Returns the new
    /// availability.
    pub async fn health_check(&self) -> bool {
        let Some(store) = self.store.as_ref() else {
            return false;
        };
        match store.ping().await {
            Ok(()) => {
                self.available.store(true, Ordering::Relaxed);
                true
            }
            Err(_) => false,
        }
    }

    pub async fn zadd(&self, key: &str, member: &str, score: i64) -> Option<()> {
        let store = self.active_store()?;
        match store.zadd(key, member, score).await {
            Ok(v) => Some(v),
            Err(e) => {
                self.degrade("zadd", e);
                None
            }
        }
    }

    pub async fn zrank(&self, key: &str, member: &str) -> Option<Option<i64>> {
        let store = self.active_store()?;
        match store.zrank(key, member).await {
            Ok(v) => Some(v),
            Err(e) => {
                self.degrade("zrank", e);
                None
            }
        }
    }

    pub async fn zcard(&self, key: &str) -> Option<i64> {
        let store = self.active_store()?;
        match store.zcard(key).await {
            Ok(v) => Some(v),
            Err(e) => {
                self.degrade("zcard", e);
                None
            }
        }
    }

    pub async fn zrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Option<Vec<(String, i64)>> {
        let store = self.active_store()?;
        match store.zrange_with_scores(key, start, stop).await {
            Ok(v) => Some(v),
            Err(e) => {
                self.degrade("zrange", e);
                None
            }
        }
    }

    pub async fn get(&self, key: &str) -> Option<Option<String>> {
        let store = self.active_store()?;
        match store.get(key).await {
            Ok(v) => Some(v),
            Err(e) => {
                self.degrade("get", e);
                None
            }
        }
    }

    pub async fn incr(&self, key: &str) -> Option<i64> {
        let store = self.active_store()?;
        match store.incr(key).await {
            Ok(v) => Some(v),
            Err(e) => {
                self.degrade("incr", e);
                None
            }
        }
    }

    pub async fn expire(&self, key: &str, seconds: i64) -> Option<()> {
        let store = self.active_store()?;
        match store.expire(key, seconds).await {
            Ok(v) => Some(v),
            Err(e) => {
                self.degrade("expire", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_path_answers_nothing() {
        let path = FastPath::disabled();
        assert!(!path.available());
        assert_eq!(path.incr("ratelimit:u:2026-08-07").await, None);
        assert_eq!(path.zcard("leaderboard:global:2026-08-07").await, None);
        assert!(!path.health_check().await);
    }

    #[tokio::test]
    async fn healthy_path_answers() {
        let path = FastPath::new(Arc::new(MemoryStore::default()));
        assert!(path.available());
        assert_eq!(path.incr("k").await, Some(1));
        assert_eq!(path.incr("k").await, Some(2));
        assert!(path.health_check().await);
    }
}
