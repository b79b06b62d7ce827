//! In-memory [`FastStore`] twin
//!
//! Mirrors the Redis command semantics the crate relies on, minus key expiry
//! (entries simply persist for the process lifetime). Used by the test suite
//! and by local runs without a configured Redis.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{FastStore, StoreResult};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    // key -> member -> score
    sorted: HashMap<String, HashMap<String, i64>>,
    strings: HashMap<String, String>,
}

impl MemoryStore {
    // Ascending (score, member), the sorted-set iteration order.
    fn ordered(&self, key: &str) -> Vec<(String, i64)> {
        let inner = self.inner.lock().unwrap();
        let Some(set) = inner.sorted.get(key) else {
            return Vec::new();
        };
        let mut entries: Vec<(String, i64)> = set
            .iter()
            .map(|(member, &score)| (member.clone(), score))
            .collect();
        entries.sort_by(|a, b| (a.1, &a.0).cmp(&(b.1, &b.0)));
        entries
    }
}

#[async_trait]
impl FastStore for MemoryStore {
    async fn zadd(&self, key: &str, member: &str, score: i64) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .sorted
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zrank(&self, key: &str, member: &str) -> StoreResult<Option<i64>> {
        Ok(self
            .ordered(key)
            .iter()
            .position(|(m, _)| m == member)
            .map(|pos| pos as i64))
    }

    async fn zcard(&self, key: &str) -> StoreResult<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.sorted.get(key).map_or(0, |set| set.len() as i64))
    }

    async fn zrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<(String, i64)>> {
        let entries = self.ordered(key);
        let len = entries.len() as i64;
        let stop = if stop < 0 { len + stop } else { stop };
        let start = start.max(0);
        if start >= len || stop < start {
            return Ok(Vec::new());
        }
        let stop = stop.min(len - 1);
        Ok(entries[start as usize..=stop as usize].to_vec())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.strings.get(key).cloned())
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut inner = self.inner.lock().unwrap();
        let value = inner.strings.entry(key.to_string()).or_insert_with(|| "0".into());
        let next = value.parse::<i64>().unwrap_or(0) + 1;
        *value = next.to_string();
        Ok(next)
    }

    async fn expire(&self, _key: &str, _seconds: i64) -> StoreResult<()> {
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
