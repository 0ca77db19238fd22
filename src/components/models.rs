use crate::error::{config_error, ScheduleResult};
use crate::utils::time::local_midnight;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest display window, in days
pub const MAX_DAYS_AHEAD: u32 = 3660;

/// Inclusive `[start, end]` range of instants an occurrence must fall in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl Window {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { start, end }
    }

    /// `[today 00:00, today 00:00 + days]` in the timezone of `now`.
    ///
    /// Windows longer than [`MAX_DAYS_AHEAD`] are a configuration error.
    pub fn days_ahead(now: DateTime<Tz>, days: u32) -> ScheduleResult<Self> {
        if days > MAX_DAYS_AHEAD {
            return Err(config_error(&format!(
                "days_ahead must be at most {MAX_DAYS_AHEAD}, got {days}"
            )));
        }
        let tz = now.timezone();
        let start = local_midnight(&tz, now.date_naive()).unwrap_or(now);
        let end = start
            .checked_add_signed(Duration::days(days as i64))
            .ok_or_else(|| config_error(&format!("Window of {days} days is out of range")))?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, instant: &DateTime<Tz>) -> bool {
        *instant >= self.start && *instant <= self.end
    }

    pub fn timezone(&self) -> Tz {
        self.start.timezone()
    }
}

/// Start and end wall-clock times shown next to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// One concrete, display-ready occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Absolute start, carrying the display timezone's offset
    pub start: DateTime<FixedOffset>,
    /// Calendar date of `start` in the display timezone
    pub date: NaiveDate,
    /// Localized weekday label for `date`
    pub weekday: String,
    /// Empty for all-day events and when no end is known
    pub time: Option<TimeRange>,
    pub all_day: bool,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// `#RRGGBB`, or `None` for the renderer default
    pub color: Option<String>,
    /// Feed URL or calendar id the event came from
    pub source: String,
}

impl Event {
    /// Start time-of-day used for ordering; `None` sorts after any time on the same date
    pub fn display_time(&self) -> Option<NaiveTime> {
        self.time.map(|t| t.start)
    }
}

/// Sort key shared by the list and grid layouts: date, then start time, untimed last
pub fn display_order_key(event: &Event) -> (NaiveDate, bool, Option<NaiveTime>) {
    let time = event.display_time();
    (event.date, time.is_none(), time)
}

/// What one source contributed to an aggregation
#[derive(Debug, Clone, Default)]
pub struct SourceReport {
    pub events: Vec<Event>,
    /// VEVENT blocks (or API items) examined
    pub parsed: usize,
    /// Blocks dropped as incomplete or with an unreadable start
    pub discarded: usize,
    /// Calendar name advertised by the feed, if any
    pub calendar_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Tokyo;

    #[test]
    fn test_days_ahead_window() {
        let now = Tokyo.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap();
        let window = Window::days_ahead(now, 30).unwrap();
        assert_eq!(window.start.to_rfc3339(), "2026-01-05T00:00:00+09:00");
        assert_eq!(window.end.to_rfc3339(), "2026-02-04T00:00:00+09:00");
        assert!(window.contains(&window.end));
    }

    #[test]
    fn test_days_ahead_rejects_oversized_window() {
        let now = Tokyo.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap();
        assert!(Window::days_ahead(now, MAX_DAYS_AHEAD).is_ok());
        let err = Window::days_ahead(now, u32::MAX).unwrap_err();
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
