use super::{keys, CacheKey, EventCache};
use crate::components::models::Event;
use crate::error::{cache_error, ScheduleResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client as RedisClient};
use std::time::Duration;
use tracing::info;

/// Keys fetched per SCAN round trip during clear-all
const SCAN_BATCH: usize = 200;

/// Shared cache backed by Redis
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    ttl: Duration,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").field("ttl", &self.ttl).finish()
    }
}

impl RedisCache {
    /// Connect to `redis_url`; the manager reconnects on its own afterwards
    pub async fn connect(redis_url: &str, ttl: Duration) -> ScheduleResult<Self> {
        let client = RedisClient::open(redis_url)
            .map_err(|e| cache_error(&format!("Failed to create Redis client: {e}")))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| cache_error(&format!("Failed to connect to Redis: {e}")))?;
        info!("Connected to Redis cache");
        Ok(Self { connection, ttl })
    }
}

#[async_trait]
impl EventCache for RedisCache {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &CacheKey) -> ScheduleResult<Option<Vec<Event>>> {
        let mut conn = self.connection.clone();
        let events_json: Option<String> = conn.get(key.as_str()).await?;

        match events_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &CacheKey, events: &[Event]) -> ScheduleResult<()> {
        let mut conn = self.connection.clone();
        let events_json = serde_json::to_string(events)?;
        () = conn.set_ex(key.as_str(), events_json, self.ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn clear_all(&self) -> ScheduleResult<usize> {
        let mut conn = self.connection.clone();
        let mut cursor: u64 = 0;
        let mut removed = 0usize;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(keys::PATTERN)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !batch.is_empty() {
                let deleted: usize = conn.del(&batch).await?;
                removed += deleted;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }

        info!(removed, "Cleared cached schedule events");
        Ok(removed)
    }
}
