use super::{EventFilter, FeedParser};
use crate::components::models::{SourceReport, Window};
use crate::components::EventSource;
use crate::error::{feed_error, Error, ScheduleResult};
use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

/// An iCalendar feed fetched over HTTP
#[derive(Debug, Clone)]
pub struct IcsSource {
    url: String,
    client: Client,
    parser: FeedParser,
}

impl IcsSource {
    /// `client` carries the fetch timeout
    pub fn new(url: &str, client: Client, parser: FeedParser) -> Self {
        Self {
            url: url.trim().to_string(),
            client,
            parser,
        }
    }

    /// `webcal://` is a scheme hint for calendar apps; the feed itself is served over HTTPS
    fn fetch_url(&self) -> String {
        match self.url.strip_prefix("webcal://") {
            Some(rest) => format!("https://{rest}"),
            None => self.url.clone(),
        }
    }

    async fn download(&self) -> ScheduleResult<String> {
        let response = self.client.get(self.fetch_url()).send().await?;

        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "Failed to fetch feed {}: HTTP {}",
                self.url,
                response.status()
            )));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(feed_error(&format!("Feed {} returned an empty body", self.url)));
        }
        Ok(body)
    }
}

#[async_trait]
impl EventSource for IcsSource {
    fn id(&self) -> &str {
        &self.url
    }

    async fn fetch(&self, window: &Window, filter: &EventFilter) -> ScheduleResult<SourceReport> {
        info!(url = %self.url, "Fetching calendar feed");
        let body = self.download().await?;
        let report = self.parser.parse(&body, window, filter, &self.url);
        info!(
            url = %self.url,
            events = report.events.len(),
            blocks = report.parsed,
            discarded = report.discarded,
            "Calendar feed parsed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::feed::DateTimeResolver;
    use chrono_tz::Asia::Tokyo;

    #[test]
    fn test_webcal_is_fetched_over_https() {
        let parser = FeedParser::new(DateTimeResolver::new(Tokyo, Tokyo), "en");
        let source = IcsSource::new(" webcal://example.com/cal.ics ", Client::new(), parser.clone());
        assert_eq!(source.id(), "webcal://example.com/cal.ics");
        assert_eq!(source.fetch_url(), "https://example.com/cal.ics");

        let source = IcsSource::new("http://example.com/cal.ics", Client::new(), parser);
        assert_eq!(source.fetch_url(), "http://example.com/cal.ics");
    }
}
