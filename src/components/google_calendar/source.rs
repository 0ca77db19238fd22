use super::models::{CalendarItem, ColorTable, EventList, ItemTime};
use crate::components::feed::materializer::EventDraft;
use crate::components::feed::{EventFilter, Materializer};
use crate::components::models::{SourceReport, Window};
use crate::components::EventSource;
use crate::error::{google_calendar_error, ScheduleResult};
use crate::utils::time::local_midnight;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

/// Upper bound the API accepts for one page of events
const MAX_RESULTS: &str = "2500";

/// A Google Calendar read through the public REST API with an API key
#[derive(Debug, Clone)]
pub struct GoogleCalendarSource {
    calendar_id: String,
    api_key: String,
    api_base: String,
    client: Client,
    locale: String,
}

impl GoogleCalendarSource {
    pub fn new(calendar_id: &str, api_key: &str, api_base: &str, client: Client, locale: &str) -> Self {
        Self {
            calendar_id: calendar_id.trim().to_string(),
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
            locale: locale.to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> ScheduleResult<Url> {
        let url_str = format!("{}/{}", self.api_base, path);
        Url::parse(&url_str).map_err(|e| google_calendar_error(&format!("Failed to parse URL: {e}")))
    }

    fn events_url(&self, window: &Window) -> ScheduleResult<Url> {
        let path = format!("calendars/{}/events", urlencoding::encode(&self.calendar_id));
        let mut url = self.endpoint(&path)?;
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("timeMin", &window.start.to_rfc3339())
            .append_pair("timeMax", &window.end.to_rfc3339())
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime")
            .append_pair("maxResults", MAX_RESULTS);
        Ok(url)
    }

    async fn fetch_events(&self, window: &Window) -> ScheduleResult<EventList> {
        let response = self.client.get(self.events_url(window)?).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to fetch events: HTTP {status} - {error_body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse events response: {e}")))
    }

    async fn fetch_colors(&self) -> ScheduleResult<ColorTable> {
        let mut url = self.endpoint("colors")?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(google_calendar_error(&format!(
                "Failed to fetch colors: HTTP {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse colors response: {e}")))
    }
}

/// Start or end of an item in `tz`, and whether it is a whole-day value
fn resolve_item_time(time: &ItemTime, tz: &Tz) -> Option<(DateTime<Tz>, bool)> {
    if let Some(date_time) = time.date_time.as_deref() {
        let parsed = DateTime::parse_from_rfc3339(date_time).ok()?;
        return Some((parsed.with_timezone(tz), false));
    }
    let date = NaiveDate::parse_from_str(time.date.as_deref()?, "%Y-%m-%d").ok()?;
    local_midnight(tz, date).map(|midnight| (midnight, true))
}

fn draft_from_item<'a>(item: &'a CalendarItem, colors: &'a ColorTable, tz: &Tz) -> Option<EventDraft<'a>> {
    let (start, all_day) = item.start.as_ref().and_then(|s| resolve_item_time(s, tz))?;
    let end = item
        .end
        .as_ref()
        .and_then(|e| resolve_item_time(e, tz))
        .map(|(end, _)| end)
        .filter(|end| *end >= start);

    Some(EventDraft {
        start,
        end,
        all_day,
        summary: item.summary.as_deref(),
        description: item.description.as_deref(),
        location: item.location.as_deref(),
        color: item.color_id.as_deref().and_then(|id| colors.background(id)),
    })
}

#[async_trait]
impl EventSource for GoogleCalendarSource {
    fn id(&self) -> &str {
        &self.calendar_id
    }

    async fn fetch(&self, window: &Window, filter: &EventFilter) -> ScheduleResult<SourceReport> {
        info!(calendar_id = %self.calendar_id, "Fetching Google Calendar events");

        let colors = self.fetch_colors().await.unwrap_or_else(|e| {
            warn!(calendar_id = %self.calendar_id, "Event colors unavailable: {}", e);
            ColorTable::default()
        });
        let list = self.fetch_events(window).await?;

        let tz = window.timezone();
        let materializer = Materializer::new(filter.clone(), &self.locale, &self.calendar_id);
        let mut report = SourceReport {
            parsed: list.items.len(),
            ..Default::default()
        };

        for item in list.items.iter().filter(|item| !item.is_cancelled()) {
            let Some(draft) = draft_from_item(item, &colors, &tz) else {
                debug!(summary = item.summary.as_deref(), "Skipping item without a readable start");
                report.discarded += 1;
                continue;
            };
            if !window.contains(&draft.start) {
                continue;
            }
            if let Some(event) = materializer.finish(draft) {
                report.events.push(event);
            }
        }

        info!(
            calendar_id = %self.calendar_id,
            events = report.events.len(),
            "Google Calendar events fetched"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Tokyo;

    #[test]
    fn test_resolve_item_time() {
        let timed = ItemTime {
            date: None,
            date_time: Some("2026-01-05T00:00:00Z".to_string()),
        };
        let (start, all_day) = resolve_item_time(&timed, &Tokyo).unwrap();
        assert_eq!(start.format("%Y-%m-%d %H:%M").to_string(), "2026-01-05 09:00");
        assert!(!all_day);

        let whole_day = ItemTime {
            date: Some("2026-01-12".to_string()),
            date_time: None,
        };
        let (start, all_day) = resolve_item_time(&whole_day, &Tokyo).unwrap();
        assert_eq!(start.format("%Y-%m-%d %H:%M").to_string(), "2026-01-12 00:00");
        assert!(all_day);

        assert!(resolve_item_time(&ItemTime::default(), &Tokyo).is_none());
    }

    #[test]
    fn test_events_url_carries_query() {
        let source = GoogleCalendarSource::new(
            "team@group.calendar.google.com",
            "secret",
            "https://example.test/calendar/v3/",
            Client::new(),
            "en",
        );
        let now = Tokyo.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        let url = source.events_url(&Window::days_ahead(now, 7).unwrap()).unwrap();

        assert_eq!(url.path(), "/calendar/v3/calendars/team%40group.calendar.google.com/events");
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(query.get("key").map(String::as_str), Some("secret"));
        assert_eq!(query.get("singleEvents").map(String::as_str), Some("true"));
        assert_eq!(query.get("orderBy").map(String::as_str), Some("startTime"));
        assert_eq!(query.get("timeMin").map(String::as_str), Some("2026-01-05T00:00:00+09:00"));
        assert_eq!(query.get("timeMax").map(String::as_str), Some("2026-01-12T00:00:00+09:00"));
    }
}
