use super::{CacheKey, EventCache, DEFAULT_TTL};
use crate::components::models::Event;
use crate::error::{cache_error, ScheduleResult};
use crate::utils::time::{Clock, SystemClock};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry {
    expires_at: DateTime<Utc>,
    events: Vec<Event>,
}

/// Process-local cache, used when no Redis URL is configured
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, Entry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache").field("ttl", &self.ttl).finish()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    fn expiry(&self) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero());
        self.clock.now() + ttl
    }
}

#[async_trait]
impl EventCache for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> ScheduleResult<Option<Vec<Event>>> {
        let now = self.clock.now();
        let entries = self
            .entries
            .read()
            .map_err(|_| cache_error("Memory cache lock poisoned"))?;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.events.clone()))
    }

    async fn put(&self, key: &CacheKey, events: &[Event]) -> ScheduleResult<()> {
        let entry = Entry {
            expires_at: self.expiry(),
            events: events.to_vec(),
        };
        let now = self.clock.now();
        let mut entries = self
            .entries
            .write()
            .map_err(|_| cache_error("Memory cache lock poisoned"))?;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(key.clone(), entry);
        Ok(())
    }

    async fn clear_all(&self) -> ScheduleResult<usize> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| cache_error("Memory cache lock poisoned"))?;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}
