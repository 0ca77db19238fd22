// Tests for the HTTP-backed event sources.
use chrono::TimeZone;
use chrono_tz::Asia::Tokyo;
use mockito::{Matcher, Server};
use reqwest::Client;
use schedule_display::components::feed::{DateTimeResolver, EventFilter, ExclusionList, FeedParser};
use schedule_display::components::models::Window;
use schedule_display::components::{EventSource, GoogleCalendarSource, IcsSource};
use schedule_display::error::Error;

fn window() -> Window {
    // Monday 2026-01-05 09:00 in Tokyo, 30 days ahead
    Window::days_ahead(Tokyo.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap(), 30).unwrap()
}

fn parser() -> FeedParser {
    FeedParser::new(DateTimeResolver::new(Tokyo, Tokyo), "en")
}

const FEED: &str = "BEGIN:VCALENDAR\r\n\
X-WR-CALNAME:Choir\r\n\
BEGIN:VEVENT\r\n\
DTSTART;TZID=Asia/Tokyo:20260110T140000\r\n\
DTEND;TZID=Asia/Tokyo:20260110T160000\r\n\
SUMMARY:Choir practice\r\n\
LOCATION:Hall B\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

#[tokio::test]
async fn test_ics_source_downloads_and_parses_feed() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/choir.ics")
        .with_status(200)
        .with_header("content-type", "text/calendar")
        .with_body(FEED)
        .create_async()
        .await;

    let url = format!("{}/choir.ics", server.url());
    let source = IcsSource::new(&url, Client::new(), parser());
    let report = source.fetch(&window(), &EventFilter::default()).await.unwrap();

    mock.assert();
    assert_eq!(report.calendar_name.as_deref(), Some("Choir"));
    assert_eq!(report.events.len(), 1);
    let event = &report.events[0];
    assert_eq!(event.title, "Choir practice");
    assert_eq!(event.location.as_deref(), Some("Hall B"));
    assert_eq!(event.source, url);
    assert_eq!(event.time.map(|t| t.to_string()).as_deref(), Some("14:00 - 16:00"));
}

#[tokio::test]
async fn test_ics_source_reports_http_failure() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/missing.ics")
        .with_status(404)
        .create_async()
        .await;

    let source = IcsSource::new(&format!("{}/missing.ics", server.url()), Client::new(), parser());
    let err = source.fetch(&window(), &EventFilter::default()).await.unwrap_err();

    mock.assert();
    assert!(matches!(err, Error::Transport(_)), "unexpected error {err:?}");
}

#[tokio::test]
async fn test_ics_source_rejects_empty_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/empty.ics")
        .with_status(200)
        .with_body("  \r\n")
        .create_async()
        .await;

    let source = IcsSource::new(&format!("{}/empty.ics", server.url()), Client::new(), parser());
    let err = source.fetch(&window(), &EventFilter::default()).await.unwrap_err();

    mock.assert();
    assert!(matches!(err, Error::Feed(_)), "unexpected error {err:?}");
}

const EVENTS_BODY: &str = r#"{
    "kind": "calendar#events",
    "items": [
        {
            "summary": "Standup",
            "start": {"dateTime": "2026-01-06T00:00:00Z"},
            "end": {"dateTime": "2026-01-06T00:15:00Z"},
            "colorId": "9"
        },
        {
            "summary": "Founding day",
            "start": {"date": "2026-01-12"},
            "end": {"date": "2026-01-13"}
        },
        {
            "summary": "Dropped sync",
            "status": "cancelled",
            "start": {"dateTime": "2026-01-07T01:00:00Z"}
        },
        {
            "summary": "Spring offsite",
            "start": {"dateTime": "2026-03-02T01:00:00Z"},
            "end": {"dateTime": "2026-03-02T08:00:00Z"}
        },
        {
            "summary": "Lunch",
            "start": {"dateTime": "2026-01-08T03:00:00Z"},
            "end": {"dateTime": "2026-01-08T04:00:00Z"}
        }
    ]
}"#;

const COLORS_BODY: &str = r##"{
    "kind": "calendar#colors",
    "event": {
        "9": {"background": "#5484ed", "foreground": "#1d1d1d"}
    }
}"##;

fn events_query() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("key".into(), "secret".into()),
        Matcher::UrlEncoded("singleEvents".into(), "true".into()),
        Matcher::UrlEncoded("orderBy".into(), "startTime".into()),
        Matcher::UrlEncoded("timeMin".into(), "2026-01-05T00:00:00+09:00".into()),
    ])
}

fn google_source(server: &Server) -> GoogleCalendarSource {
    GoogleCalendarSource::new("team", "secret", &server.url(), Client::new(), "en")
}

#[tokio::test]
async fn test_google_source_maps_items_to_events() {
    let mut server = Server::new_async().await;
    let events_mock = server
        .mock("GET", "/calendars/team/events")
        .match_query(events_query())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(EVENTS_BODY)
        .create_async()
        .await;
    let colors_mock = server
        .mock("GET", "/colors")
        .match_query(Matcher::UrlEncoded("key".into(), "secret".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(COLORS_BODY)
        .create_async()
        .await;

    let filter = EventFilter::new(ExclusionList::parse("lunch"));
    let report = google_source(&server).fetch(&window(), &filter).await.unwrap();

    events_mock.assert();
    colors_mock.assert();
    assert_eq!(report.parsed, 5);

    let titles: Vec<_> = report.events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Standup", "Founding day"]);

    let standup = &report.events[0];
    assert_eq!(standup.color.as_deref(), Some("#5484ED"));
    assert_eq!(standup.time.map(|t| t.to_string()).as_deref(), Some("09:00 - 09:15"));
    assert_eq!(standup.source, "team");

    let holiday = &report.events[1];
    assert!(holiday.all_day);
    assert!(holiday.time.is_none());
    assert_eq!(holiday.date.to_string(), "2026-01-12");
    assert_eq!(holiday.weekday, "Mon");
}

#[tokio::test]
async fn test_google_source_survives_missing_colors() {
    let mut server = Server::new_async().await;
    let _events_mock = server
        .mock("GET", "/calendars/team/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(EVENTS_BODY)
        .create_async()
        .await;
    let colors_mock = server
        .mock("GET", "/colors")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let report = google_source(&server)
        .fetch(&window(), &EventFilter::default())
        .await
        .unwrap();

    colors_mock.assert();
    assert_eq!(report.events.len(), 3);
    assert!(report.events.iter().all(|e| e.color.is_none()));
}

#[tokio::test]
async fn test_google_source_reports_api_errors() {
    let mut server = Server::new_async().await;
    let _colors_mock = server
        .mock("GET", "/colors")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(COLORS_BODY)
        .create_async()
        .await;
    let events_mock = server
        .mock("GET", "/calendars/team/events")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"error": {"code": 403, "message": "API key not valid"}}"#)
        .create_async()
        .await;

    let err = google_source(&server)
        .fetch(&window(), &EventFilter::default())
        .await
        .unwrap_err();

    events_mock.assert();
    assert!(matches!(err, Error::GoogleCalendar(_)), "unexpected error {err:?}");
    assert!(err.to_string().contains("403"));
}
