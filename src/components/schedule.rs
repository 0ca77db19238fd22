use crate::components::aggregator::{Aggregator, SourceStatus};
use crate::components::cache::{CacheKey, EventCache};
use crate::components::feed::{EventFilter, ExclusionList};
use crate::components::layout::{build_grids, group_by_month, GridOptions, MonthGrid, MonthGroup};
use crate::components::models::{Event, Window};
use crate::components::EventSource;
use crate::error::{config_error, ScheduleResult};
use crate::utils::time::{Clock, WeekStart};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    List,
    Grid,
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(DisplayMode::List),
            "grid" | "calendar" => Ok(DisplayMode::Grid),
            other => Err(format!("unknown display mode '{other}'")),
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayMode::List => f.write_str("list"),
            DisplayMode::Grid => f.write_str("grid"),
        }
    }
}

/// One render of the schedule
#[derive(Clone)]
pub struct ScheduleRequest {
    /// Calendars to read, in order; the order is part of the cache key
    pub sources: Vec<Arc<dyn EventSource>>,
    pub days_ahead: u32,
    /// Comma separated title substrings to hide
    pub exclude_patterns: String,
    pub mode: DisplayMode,
    pub week_start: WeekStart,
    /// Bypass the cache and collect diagnostics
    pub debug: bool,
}

impl fmt::Debug for ScheduleRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleRequest")
            .field("sources", &self.sources.iter().map(|s| s.id()).collect::<Vec<_>>())
            .field("days_ahead", &self.days_ahead)
            .field("exclude_patterns", &self.exclude_patterns)
            .field("mode", &self.mode)
            .field("week_start", &self.week_start)
            .field("debug", &self.debug)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Hit,
    Miss,
    Bypassed,
}

/// Debug-mode detail about how a render was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub cache: CacheStatus,
    pub cache_backend: &'static str,
    pub cache_key: String,
    pub window_start: String,
    pub window_end: String,
    pub sources: Vec<SourceStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "months", rename_all = "lowercase")]
pub enum ScheduleView {
    /// Valid sources, nothing to show in the window
    Empty,
    List(Vec<MonthGroup>),
    Grid(Vec<MonthGrid>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleOutcome {
    pub view: ScheduleView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

/// Aggregates, caches and lays out events for display
pub struct ScheduleService {
    cache: Arc<dyn EventCache>,
    clock: Arc<dyn Clock>,
    display_tz: Tz,
    grid: GridOptions,
    locale: String,
}

impl fmt::Debug for ScheduleService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleService")
            .field("cache", &self.cache.name())
            .field("display_tz", &self.display_tz)
            .field("grid", &self.grid)
            .field("locale", &self.locale)
            .finish()
    }
}

impl ScheduleService {
    pub fn new(cache: Arc<dyn EventCache>, clock: Arc<dyn Clock>, display_tz: Tz, locale: &str) -> Self {
        Self {
            cache,
            clock,
            display_tz,
            grid: GridOptions::default(),
            locale: locale.to_string(),
        }
    }

    pub fn with_grid_options(mut self, grid: GridOptions) -> Self {
        self.grid = grid;
        self
    }

    /// Produce the view for `request`.
    ///
    /// Only a request without sources is an error; failing sources and cache
    /// problems degrade to fewer events.
    pub async fn render(&self, request: &ScheduleRequest) -> ScheduleResult<ScheduleOutcome> {
        if request.sources.is_empty() {
            return Err(config_error("No calendar sources configured"));
        }

        let now = self.clock.now().with_timezone(&self.display_tz);
        let window = Window::days_ahead(now, request.days_ahead)?;
        let aggregator = Aggregator::new(request.sources.clone());
        let filter = EventFilter::new(ExclusionList::parse(&request.exclude_patterns));
        let key = CacheKey::fingerprint(&aggregator.source_ids(), request.days_ahead, &request.exclude_patterns);

        let (mut events, cache_status, sources) = if request.debug {
            let aggregation = aggregator.collect(&window, &filter).await;
            (aggregation.events, CacheStatus::Bypassed, aggregation.sources)
        } else {
            self.cached_events(&aggregator, &key, &window, &filter).await
        };

        // Cached entries may predate a day boundary
        events.retain(|e| window.contains(&e.start.with_timezone(&self.display_tz)));

        let view = self.layout(&events, request, &window);
        info!(mode = %request.mode, events = events.len(), cache = ?cache_status, "Schedule rendered");

        let diagnostics = request.debug.then(|| Diagnostics {
            cache: cache_status,
            cache_backend: self.cache.name(),
            cache_key: key.to_string(),
            window_start: window.start.to_rfc3339(),
            window_end: window.end.to_rfc3339(),
            sources,
        });

        Ok(ScheduleOutcome { view, diagnostics })
    }

    async fn cached_events(
        &self,
        aggregator: &Aggregator,
        key: &CacheKey,
        window: &Window,
        filter: &EventFilter,
    ) -> (Vec<Event>, CacheStatus, Vec<SourceStatus>) {
        match self.cache.get(key).await {
            Ok(Some(events)) => {
                debug!(%key, "Schedule cache hit");
                return (events, CacheStatus::Hit, Vec::new());
            }
            Ok(None) => debug!(%key, "Schedule cache miss"),
            Err(e) => warn!(backend = self.cache.name(), "Cache read failed, treating as miss: {}", e),
        }

        let aggregation = aggregator.collect(window, filter).await;
        if aggregation.sources.iter().any(|s| s.error.is_some()) {
            debug!(%key, "Not caching a partial aggregation");
        } else if let Err(e) = self.cache.put(key, &aggregation.events).await {
            warn!(backend = self.cache.name(), "Cache write failed: {}", e);
        }
        (aggregation.events, CacheStatus::Miss, aggregation.sources)
    }

    fn layout(&self, events: &[Event], request: &ScheduleRequest, window: &Window) -> ScheduleView {
        if events.is_empty() {
            return ScheduleView::Empty;
        }
        match request.mode {
            DisplayMode::List => ScheduleView::List(group_by_month(events)),
            DisplayMode::Grid => ScheduleView::Grid(build_grids(
                events,
                window.start.date_naive(),
                request.days_ahead,
                request.week_start,
                &self.grid,
                &self.locale,
            )),
        }
    }

    /// Drop every cached aggregation
    pub async fn clear_cache(&self) -> ScheduleResult<usize> {
        let removed = self.cache.clear_all().await?;
        info!(removed, backend = self.cache.name(), "Schedule cache cleared");
        Ok(removed)
    }
}
