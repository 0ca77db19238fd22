use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(schedule::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(schedule::config),
        help("check config/schedule.toml and the SCHEDULE_* environment variables")
    )]
    Config(String),

    #[error("Feed error: {0}")]
    #[diagnostic(code(schedule::feed))]
    Feed(String),

    #[error("Transport error: {0}")]
    #[diagnostic(code(schedule::transport))]
    Transport(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(schedule::google_calendar))]
    GoogleCalendar(String),

    #[error("Cache error: {0}")]
    #[diagnostic(code(schedule::cache))]
    Cache(String),

    #[error(transparent)]
    #[diagnostic(code(schedule::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(schedule::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(schedule::other))]
    Other(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Transport(format!("request timed out: {err}"))
        } else {
            Error::Transport(err.to_string())
        }
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type ScheduleResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Invalid environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create feed errors
pub fn feed_error(message: &str) -> Error {
    Error::Feed(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create cache errors
pub fn cache_error(message: &str) -> Error {
    Error::Cache(message.to_string())
}
