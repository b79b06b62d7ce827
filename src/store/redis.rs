//! Redis-backed [`FastStore`]
//!
//! Connection management keeps retries bounded and timeouts short: a slow
//! Redis must degrade into the durable fallback, not stall submissions.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};

use super::{FastStore, StoreResult};

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(2)
            .set_connection_timeout(Duration::from_millis(500))
            .set_response_timeout(Duration::from_millis(500));

        let client = Client::open(url)?;
        let conn = client.get_connection_manager_with_config(config).await?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl FastStore for RedisStore {
    async fn zadd(&self, key: &str, member: &str, score: i64) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn zrank(&self, key: &str, member: &str) -> StoreResult<Option<i64>> {
        let mut conn = self.conn.clone();
        Ok(conn.zrank(key, member).await?)
    }

    async fn zcard(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        Ok(conn.zcard(key).await?)
    }

    async fn zrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<(String, i64)>> {
        let mut conn = self.conn.clone();
        Ok(conn
            .zrange_withscores(key, start as isize, stop as isize)
            .await?)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        Ok(conn.incr(key, 1).await?)
    }

    async fn expire(&self, key: &str, seconds: i64) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.expire(key, seconds).await?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
