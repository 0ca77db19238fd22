use serde::Deserialize;
use std::collections::HashMap;

/// Response of `GET /calendars/{id}/events`
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<CalendarItem>,
}

/// One event as returned by the Calendar API (single-event expansion)
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CalendarItem {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<ItemTime>,
    pub end: Option<ItemTime>,
    pub color_id: Option<String>,
    pub status: Option<String>,
}

impl CalendarItem {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }
}

/// Either `date` (all-day) or `dateTime` (RFC 3339) is set
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ItemTime {
    pub date: Option<String>,
    pub date_time: Option<String>,
}

/// Response of `GET /colors`
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ColorTable {
    #[serde(default)]
    pub event: HashMap<String, ColorDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColorDefinition {
    pub background: String,
}

impl ColorTable {
    pub fn background(&self, color_id: &str) -> Option<&str> {
        self.event.get(color_id).map(|c| c.background.as_str())
    }
}
