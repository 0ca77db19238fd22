use crate::components::feed::EventFilter;
use crate::components::models::{Event, Window};
use crate::components::EventSource;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one source within an aggregation
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceStatus {
    pub source: String,
    pub events: usize,
    pub parsed: usize,
    pub discarded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Merged events of every source plus per-source status
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub events: Vec<Event>,
    pub sources: Vec<SourceStatus>,
}

/// Reads every configured source in order and merges the results
#[derive(Clone, Default)]
pub struct Aggregator {
    sources: Vec<Arc<dyn EventSource>>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("sources", &self.source_ids())
            .finish()
    }
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn EventSource>>) -> Self {
        Self { sources }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Source identifiers in configuration order
    pub fn source_ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.id().to_string()).collect()
    }

    /// Events of all sources inside `window`, ordered by start.
    ///
    /// A failing source contributes nothing; its error is recorded in its status.
    pub async fn collect(&self, window: &Window, filter: &EventFilter) -> Aggregation {
        let mut aggregation = Aggregation::default();

        for source in &self.sources {
            let id = source.id().to_string();
            match source.fetch(window, filter).await {
                Ok(report) => {
                    // Sources may report more than they were asked for
                    let events: Vec<Event> = report
                        .events
                        .into_iter()
                        .filter(|e| {
                            let start = e.start.with_timezone(&window.timezone());
                            window.contains(&start)
                        })
                        .collect();
                    aggregation.sources.push(SourceStatus {
                        source: id,
                        events: events.len(),
                        parsed: report.parsed,
                        discarded: report.discarded,
                        calendar_name: report.calendar_name,
                        error: None,
                    });
                    aggregation.events.extend(events);
                }
                Err(e) => {
                    warn!(source = %id, "Source failed, skipping: {}", e);
                    aggregation.sources.push(SourceStatus {
                        source: id,
                        events: 0,
                        parsed: 0,
                        discarded: 0,
                        calendar_name: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        // Stable: ties keep source order
        aggregation.events.sort_by_key(|e| e.start);
        info!(
            sources = self.sources.len(),
            events = aggregation.events.len(),
            "Aggregated calendar events"
        );
        aggregation
    }
}
