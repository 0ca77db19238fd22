use crate::components::feed::EventFilter;
use crate::components::models::{SourceReport, Window};
use crate::error::ScheduleResult;
use async_trait::async_trait;

pub mod aggregator;
pub mod cache;
pub mod feed;
pub mod google_calendar;
pub mod layout;
pub mod models;
pub mod schedule;

pub use aggregator::{Aggregation, Aggregator};
pub use cache::{CacheKey, EventCache};
pub use feed::IcsSource;
pub use google_calendar::GoogleCalendarSource;
pub use schedule::{ScheduleOutcome, ScheduleRequest, ScheduleService, ScheduleView};

/// A calendar that can be read into events for a window
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Identifier attached to every event (feed URL or calendar id)
    fn id(&self) -> &str;

    /// Events starting inside `window` that pass `filter`
    async fn fetch(&self, window: &Window, filter: &EventFilter) -> ScheduleResult<SourceReport>;
}
