pub mod models;
mod source;

pub use source::GoogleCalendarSource;

/// Public root of the Calendar REST API
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
