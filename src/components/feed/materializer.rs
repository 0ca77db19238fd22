use super::datetime::{is_all_day, DateTimeResolver};
use super::parser::RawPropertyBlock;
use crate::components::models::{Event, TimeRange};
use crate::utils::text::{normalize_color, normalize_text};
use crate::utils::time::weekday_label;
use chrono::{DateTime, Datelike, Duration};
use chrono_tz::Tz;
use tracing::debug;

/// Title some providers publish in place of private event details
const BUSY_PLACEHOLDER: &str = "busy";

/// Case-insensitive title substrings that hide an event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList {
    patterns: Vec<String>,
}

impl ExclusionList {
    /// Build from a comma separated pattern string; blank entries are ignored
    pub fn parse(patterns: &str) -> Self {
        let patterns = patterns
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.patterns.iter().any(|p| title.contains(p.as_str()))
    }
}

/// Drops busy placeholders and excluded titles
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    exclusions: ExclusionList,
}

impl EventFilter {
    pub fn new(exclusions: ExclusionList) -> Self {
        Self { exclusions }
    }

    pub fn admits(&self, title: &str) -> bool {
        !title.trim().eq_ignore_ascii_case(BUSY_PLACEHOLDER) && !self.exclusions.matches(title)
    }
}

/// Source-independent description of one occurrence before normalization
#[derive(Debug, Clone)]
pub struct EventDraft<'a> {
    pub start: DateTime<Tz>,
    pub end: Option<DateTime<Tz>>,
    pub all_day: bool,
    pub summary: Option<&'a str>,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    /// Raw color value carried by the event itself
    pub color: Option<&'a str>,
}

/// How long each occurrence of a VEVENT lasts, and whether it is all-day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub all_day: bool,
    pub duration: Option<Duration>,
}

impl Timing {
    /// DTEND relative to the master DTSTART, else DURATION
    pub fn of(block: &RawPropertyBlock, master_start: DateTime<Tz>, resolver: &DateTimeResolver) -> Self {
        let all_day = block.get("DTSTART").is_some_and(is_all_day);

        let from_end = block.non_empty("DTEND").and_then(|value| {
            let tzid = block.tzid("DTEND").or(block.tzid("DTSTART"));
            resolver.resolve(value, tzid).map(|end| end - master_start)
        });
        let duration = from_end
            .or_else(|| block.non_empty("DURATION").and_then(parse_duration))
            .filter(|d| *d >= Duration::zero());

        Self { all_day, duration }
    }
}

/// ISO 8601 duration such as `PT1H30M` or `P1D`; negative values are not accepted
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim().trim_start_matches('+');
    let parsed = iso8601::duration(value).ok()?;
    let std_duration: std::time::Duration = parsed.into();
    Duration::from_std(std_duration).ok()
}

/// Turns occurrences into display-ready events for one source
#[derive(Debug, Clone)]
pub struct Materializer {
    filter: EventFilter,
    calendar_color: Option<String>,
    locale: String,
    source: String,
}

impl Materializer {
    pub fn new(filter: EventFilter, locale: &str, source: &str) -> Self {
        Self {
            filter,
            calendar_color: None,
            locale: locale.to_string(),
            source: source.to_string(),
        }
    }

    /// Fallback color for events without their own (already normalized or raw)
    pub fn with_calendar_color(mut self, color: Option<&str>) -> Self {
        self.calendar_color = color.and_then(normalize_color);
        self
    }

    /// Build the event for one occurrence of a parsed VEVENT
    pub fn materialize(&self, block: &RawPropertyBlock, start: DateTime<Tz>, timing: Timing) -> Option<Event> {
        self.finish(EventDraft {
            start,
            end: timing.duration.map(|d| start + d),
            all_day: timing.all_day,
            summary: block.get("SUMMARY"),
            description: block.get("DESCRIPTION"),
            location: block.get("LOCATION"),
            color: block.color(),
        })
    }

    /// Normalize, filter and color a draft. `None` means the event is hidden.
    pub fn finish(&self, draft: EventDraft<'_>) -> Option<Event> {
        let description = draft.description.map(normalize_text).filter(|s| !s.is_empty());
        let location = draft.location.map(normalize_text).filter(|s| !s.is_empty());

        let title = draft
            .summary
            .map(normalize_text)
            .filter(|s| !s.is_empty())
            .or_else(|| description.clone())
            .or_else(|| location.clone())
            .unwrap_or_else(|| t!("untitled", locale = &self.locale).to_string());

        if !self.filter.admits(&title) {
            debug!(title = %title, source = %self.source, "Event filtered out");
            return None;
        }

        let time = match draft.end {
            Some(end) if !draft.all_day => Some(TimeRange {
                start: draft.start.time(),
                end: end.time(),
            }),
            _ => None,
        };

        let color = draft
            .color
            .and_then(normalize_color)
            .or_else(|| self.calendar_color.clone());

        Some(Event {
            start: draft.start.fixed_offset(),
            date: draft.start.date_naive(),
            weekday: weekday_label(draft.start.weekday(), &self.locale),
            time,
            all_day: draft.all_day,
            title,
            description,
            location,
            color,
            source: self.source.clone(),
        })
    }
}
