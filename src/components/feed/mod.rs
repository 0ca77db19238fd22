//! iCalendar feed pipeline: unfold, parse, resolve, expand, materialize.

pub mod datetime;
pub mod materializer;
pub mod parser;
pub mod recurrence;
pub mod source;
pub mod unfold;

pub use datetime::DateTimeResolver;
pub use materializer::{EventFilter, ExclusionList, Materializer};
pub use source::IcsSource;

use crate::components::models::{SourceReport, Window};
use materializer::Timing;
use tracing::debug;

/// Runs a feed body through the whole pipeline for one source
#[derive(Debug, Clone)]
pub struct FeedParser {
    resolver: DateTimeResolver,
    locale: String,
    safety_cap: usize,
}

impl FeedParser {
    pub fn new(resolver: DateTimeResolver, locale: &str) -> Self {
        Self {
            resolver,
            locale: locale.to_string(),
            safety_cap: recurrence::DEFAULT_SAFETY_CAP,
        }
    }

    /// Bound on generated instances for rules without COUNT
    pub fn with_safety_cap(mut self, cap: usize) -> Self {
        self.safety_cap = cap;
        self
    }

    pub fn resolver(&self) -> &DateTimeResolver {
        &self.resolver
    }

    /// Events of `body` inside `window`, in feed order
    pub fn parse(&self, body: &str, window: &Window, filter: &EventFilter, source: &str) -> SourceReport {
        let lines = unfold::unfold(body);
        let feed = parser::parse_feed(&lines);

        let materializer =
            Materializer::new(filter.clone(), &self.locale, source).with_calendar_color(feed.meta.color.as_deref());

        let mut report = SourceReport {
            parsed: feed.blocks.len() + feed.discarded,
            discarded: feed.discarded,
            calendar_name: feed.meta.name.clone(),
            ..Default::default()
        };

        for block in &feed.blocks {
            let anchor = block
                .non_empty("DTSTART")
                .and_then(|value| self.resolver.resolve(value, block.tzid("DTSTART")));
            let Some(anchor) = anchor else {
                debug!(source, summary = block.get("SUMMARY"), "Skipping event with unreadable DTSTART");
                report.discarded += 1;
                continue;
            };

            let timing = Timing::of(block, anchor, &self.resolver);
            for start in recurrence::expand(block, anchor, window, &self.resolver, self.safety_cap) {
                if let Some(event) = materializer.materialize(block, start, timing) {
                    report.events.push(event);
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Tokyo;

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
X-WR-CALNAME:Studio\r\n\
X-APPLE-CALENDAR-COLOR:#3366CC\r\n\
BEGIN:VEVENT\r\n\
DTSTART;TZID=Asia/Tokyo:20260105T090000\r\n\
DTEND;TZID=Asia/Tokyo:20260105T100000\r\n\
RRULE:FREQ=WEEKLY;COUNT=3\r\n\
SUMMARY:Weekly\r\n\
\x20\x20planning\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20260107\r\n\
SUMMARY:Busy\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART:not-a-date\r\n\
SUMMARY:Broken\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20260108\r\n\
COLOR:#f00\r\n\
SUMMARY:Holiday\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn test_parse_feed_body() {
        let parser = FeedParser::new(DateTimeResolver::new(Tokyo, Tokyo), "en");
        let window = Window::new(
            Tokyo.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            Tokyo.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap(),
        );
        let report = parser.parse(FEED, &window, &EventFilter::default(), "studio.ics");

        assert_eq!(report.calendar_name.as_deref(), Some("Studio"));
        assert_eq!(report.parsed, 4);
        assert_eq!(report.discarded, 1);

        let titles: Vec<_> = report.events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Weekly planning", "Weekly planning", "Weekly planning", "Holiday"]);

        let weekly = &report.events[2];
        assert_eq!(weekly.date.to_string(), "2026-01-19");
        assert_eq!(weekly.color.as_deref(), Some("#3366CC"));
        assert_eq!(weekly.time.map(|t| t.to_string()).as_deref(), Some("09:00 - 10:00"));

        let holiday = &report.events[3];
        assert!(holiday.all_day);
        assert_eq!(holiday.color.as_deref(), Some("#FF0000"));
        assert!(report.events.iter().all(|e| e.source == "studio.ics"));
    }
}
