use crate::components::google_calendar::DEFAULT_API_BASE;
use crate::components::layout::GridOptions;
use crate::components::models::MAX_DAYS_AHEAD;
use crate::components::schedule::DisplayMode;
use crate::error::{config_error, env_error, ScheduleResult};
use crate::utils::time::WeekStart;
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Config file read when `SCHEDULE_CONFIG` is not set
pub const DEFAULT_CONFIG_PATH: &str = "config/schedule.toml";

/// Zone of floating feed times unless configured otherwise
pub const DEFAULT_SOURCE_TIMEZONE: &str = "Asia/Tokyo";

/// One calendar to read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// iCalendar feed (http, https or webcal URL)
    Ics { url: String },
    /// Google Calendar read with an API key
    Google { calendar_id: String, api_key: String },
}

impl SourceConfig {
    pub fn id(&self) -> &str {
        match self {
            SourceConfig::Ics { url } => url,
            SourceConfig::Google { calendar_id, .. } => calendar_id,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: Vec<SourceConfig>,
    /// Length of the display window in days
    pub days_ahead: u32,
    /// Comma separated title substrings to hide
    pub exclude_patterns: String,
    pub display_mode: DisplayMode,
    /// 0 = Sunday, 1 = Monday
    pub calendar_start_day: WeekStart,
    /// Defaults to `source_timezone`
    pub display_timezone: Option<String>,
    pub source_timezone: String,
    pub locale: String,
    /// In-memory cache when absent
    pub redis_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub fetch_timeout_secs: u64,
    pub debug: bool,
    /// Bound on generated instances of an RRULE without COUNT
    pub recurrence_cap: usize,
    pub grid: GridOptions,
    pub google_api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            days_ahead: 60,
            exclude_patterns: String::new(),
            display_mode: DisplayMode::List,
            calendar_start_day: WeekStart::Sunday,
            display_timezone: None,
            source_timezone: DEFAULT_SOURCE_TIMEZONE.to_string(),
            locale: "en".to_string(),
            redis_url: None,
            cache_ttl_secs: 3600,
            fetch_timeout_secs: 30,
            debug: false,
            recurrence_cap: 365,
            grid: GridOptions::default(),
            google_api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `.env`, the config file and the environment
    pub fn load() -> ScheduleResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let mut config = match env::var("SCHEDULE_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            Err(_) => Self::default(),
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ScheduleResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            config_error(&format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ScheduleResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `SCHEDULE_*` (and `REDIS_URL`) values on top of the file settings
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ScheduleResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(urls) = get("SCHEDULE_ICS_URLS") {
            for url in urls.split(',').map(str::trim).filter(|u| !u.is_empty()) {
                self.sources.push(SourceConfig::Ics {
                    url: url.to_string(),
                });
            }
        }
        if let Some(calendar_id) = get("SCHEDULE_GOOGLE_CALENDAR_ID") {
            let api_key =
                get("SCHEDULE_GOOGLE_API_KEY").ok_or_else(|| env_error("SCHEDULE_GOOGLE_API_KEY"))?;
            self.sources.push(SourceConfig::Google {
                calendar_id,
                api_key,
            });
        }

        if let Some(days) = get("SCHEDULE_DAYS_AHEAD") {
            self.days_ahead = days
                .trim()
                .parse()
                .map_err(|_| env_error("SCHEDULE_DAYS_AHEAD"))?;
        }
        if let Some(patterns) = lookup("SCHEDULE_EXCLUDE_PATTERNS") {
            self.exclude_patterns = patterns;
        }
        if let Some(mode) = get("SCHEDULE_DISPLAY_MODE") {
            self.display_mode = mode
                .parse()
                .map_err(|_| env_error("SCHEDULE_DISPLAY_MODE"))?;
        }
        if let Some(day) = get("SCHEDULE_START_DAY") {
            self.calendar_start_day = day
                .trim()
                .parse::<u8>()
                .ok()
                .and_then(|d| WeekStart::try_from(d).ok())
                .ok_or_else(|| env_error("SCHEDULE_START_DAY"))?;
        }
        if let Some(tz) = get("SCHEDULE_DISPLAY_TIMEZONE") {
            self.display_timezone = Some(tz);
        }
        if let Some(tz) = get("SCHEDULE_SOURCE_TIMEZONE") {
            self.source_timezone = tz;
        }
        if let Some(locale) = get("SCHEDULE_LOCALE") {
            self.locale = locale;
        }
        if let Some(url) = get("REDIS_URL") {
            self.redis_url = Some(url);
        }
        if let Some(ttl) = get("SCHEDULE_CACHE_TTL_SECS") {
            self.cache_ttl_secs = ttl
                .trim()
                .parse()
                .map_err(|_| env_error("SCHEDULE_CACHE_TTL_SECS"))?;
        }
        if let Some(timeout) = get("SCHEDULE_FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = timeout
                .trim()
                .parse()
                .map_err(|_| env_error("SCHEDULE_FETCH_TIMEOUT_SECS"))?;
        }
        if let Some(debug) = get("SCHEDULE_DEBUG") {
            self.debug = matches!(debug.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(base) = get("SCHEDULE_GOOGLE_API_BASE") {
            self.google_api_base = base;
        }

        Ok(())
    }

    /// Reject settings that would fail every request
    pub fn validate(&self) -> ScheduleResult<()> {
        self.source_tz()?;
        self.display_tz()?;
        if self.days_ahead > MAX_DAYS_AHEAD {
            return Err(config_error(&format!(
                "days_ahead must be at most {MAX_DAYS_AHEAD}, got {}",
                self.days_ahead
            )));
        }
        if self.recurrence_cap == 0 {
            return Err(config_error("recurrence_cap must be at least 1"));
        }
        if self.grid.crowded_threshold == 0 {
            return Err(config_error("grid.crowded_threshold must be at least 1"));
        }
        Ok(())
    }

    pub fn source_tz(&self) -> ScheduleResult<Tz> {
        parse_timezone(&self.source_timezone)
    }

    pub fn display_tz(&self) -> ScheduleResult<Tz> {
        match self.display_timezone.as_deref() {
            Some(name) => parse_timezone(name),
            None => self.source_tz(),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn parse_timezone(name: &str) -> ScheduleResult<Tz> {
    name.trim()
        .parse()
        .map_err(|_| config_error(&format!("Unknown timezone '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.days_ahead, 60);
        assert_eq!(config.display_mode, DisplayMode::List);
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.display_tz().unwrap(), chrono_tz::Asia::Tokyo);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml_str(
            r#"
            days_ahead = 30
            display_mode = "grid"
            calendar_start_day = 1
            display_timezone = "Europe/Helsinki"

            [[sources]]
            kind = "ics"
            url = "webcal://example.com/club.ics"

            [[sources]]
            kind = "google"
            calendar_id = "team@group.calendar.google.com"
            api_key = "secret"

            [grid]
            crowded_visible = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.days_ahead, 30);
        assert_eq!(config.display_mode, DisplayMode::Grid);
        assert_eq!(config.calendar_start_day, WeekStart::Monday);
        assert_eq!(config.display_tz().unwrap(), chrono_tz::Europe::Helsinki);
        assert_eq!(config.source_tz().unwrap(), chrono_tz::Asia::Tokyo);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[1].id(), "team@group.calendar.google.com");
        assert_eq!(config.grid.crowded_visible, 3);
        assert_eq!(config.grid.crowded_threshold, 4);

        assert!(Config::from_toml_str("calendar_start_day = 3").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SCHEDULE_ICS_URLS", "https://a.test/a.ics, https://b.test/b.ics"),
            ("SCHEDULE_DAYS_AHEAD", "14"),
            ("SCHEDULE_DISPLAY_MODE", "grid"),
            ("SCHEDULE_START_DAY", "1"),
            ("SCHEDULE_DEBUG", "true"),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
        ]);
        let mut config = Config::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(
            config.sources,
            vec![
                SourceConfig::Ics { url: "https://a.test/a.ics".into() },
                SourceConfig::Ics { url: "https://b.test/b.ics".into() },
            ]
        );
        assert_eq!(config.days_ahead, 14);
        assert_eq!(config.display_mode, DisplayMode::Grid);
        assert_eq!(config.calendar_start_day, WeekStart::Monday);
        assert!(config.debug);
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        assert!(config
            .apply_overrides(|key| (key == "SCHEDULE_DAYS_AHEAD").then(|| "soon".to_string()))
            .is_err());

        let mut config = Config::default();
        assert!(config
            .apply_overrides(|key| (key == "SCHEDULE_GOOGLE_CALENDAR_ID").then(|| "team".to_string()))
            .is_err());

        let config = Config {
            display_timezone: Some("Mars/Olympus".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_error_names_the_variable() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|key| (key == "SCHEDULE_CACHE_TTL_SECS").then(|| "an hour".to_string()))
            .unwrap_err();
        assert_eq!(err.to_string(), "Environment error: Invalid environment variable: SCHEDULE_CACHE_TTL_SECS");
    }

    #[test]
    fn test_days_ahead_is_bounded() {
        let mut config = Config::default();
        config
            .apply_overrides(|key| (key == "SCHEDULE_DAYS_AHEAD").then(|| u32::MAX.to_string()))
            .unwrap();
        assert!(config.validate().is_err());

        config.days_ahead = MAX_DAYS_AHEAD;
        assert!(config.validate().is_ok());
    }
}
