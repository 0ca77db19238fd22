//! Memoization of aggregated events per request fingerprint.

mod memory;
mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

use crate::components::models::Event;
use crate::error::ScheduleResult;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;

// Cache key constants
pub mod keys {
    /// Prefix shared by every entry, so clear-all can find them
    pub const NAMESPACE: &str = "schedule_events";
    pub const PATTERN: &str = "schedule_events:*";
}

/// Reference lifetime of a cached aggregation
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Content-addressed key of one aggregation request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Fingerprint of the ordered source list, window length and exclusion string
    pub fn fingerprint<S: AsRef<str>>(sources: &[S], days_ahead: u32, exclude_patterns: &str) -> Self {
        let mut hasher = Sha256::new();
        for source in sources {
            hasher.update(source.as_ref().as_bytes());
            hasher.update(b"\n");
        }
        hasher.update(days_ahead.to_string().as_bytes());
        hasher.update(b"\n");
        hasher.update(exclude_patterns.as_bytes());

        Self(format!("{}:{}", keys::NAMESPACE, hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key/value store with a fixed TTL for aggregated events
#[async_trait]
pub trait EventCache: Send + Sync {
    /// Name used in logs and diagnostics
    fn name(&self) -> &'static str;

    /// Cached events, or `None` on a miss or an expired entry
    async fn get(&self, key: &CacheKey) -> ScheduleResult<Option<Vec<Event>>>;

    async fn put(&self, key: &CacheKey, events: &[Event]) -> ScheduleResult<()>;

    /// Remove every entry in this cache's namespace, returning how many were removed
    async fn clear_all(&self) -> ScheduleResult<usize>;
}
