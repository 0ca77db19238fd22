use crate::components::cache::{EventCache, MemoryCache, RedisCache};
use crate::components::feed::{DateTimeResolver, FeedParser, IcsSource};
use crate::components::{EventSource, GoogleCalendarSource, ScheduleService};
use crate::config::{Config, SourceConfig};
use crate::error::{Error, ScheduleResult};
use crate::utils::time::SystemClock;
use reqwest::Client;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn")),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and validate the application config
pub fn load_config() -> miette::Result<Arc<Config>> {
    match Config::load() {
        Ok(config) => {
            rust_i18n::set_locale(&config.locale);
            info!(locale = %config.locale, sources = config.sources.len(), "Configuration loaded");
            Ok(Arc::new(config))
        }
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// HTTP client shared by all sources; carries the per-request timeout
pub fn build_http_client(config: &Config) -> ScheduleResult<Client> {
    Client::builder()
        .timeout(config.fetch_timeout())
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {e}")))
}

/// One event source per configured calendar, in configuration order
pub fn build_sources(config: &Config, client: &Client) -> ScheduleResult<Vec<Arc<dyn EventSource>>> {
    let resolver = DateTimeResolver::new(config.display_tz()?, config.source_tz()?);
    let parser = FeedParser::new(resolver, &config.locale).with_safety_cap(config.recurrence_cap);

    let sources = config
        .sources
        .iter()
        .map(|source| -> Arc<dyn EventSource> {
            match source {
                SourceConfig::Ics { url } => Arc::new(IcsSource::new(url, client.clone(), parser.clone())),
                SourceConfig::Google {
                    calendar_id,
                    api_key,
                } => Arc::new(GoogleCalendarSource::new(
                    calendar_id,
                    api_key,
                    &config.google_api_base,
                    client.clone(),
                    &config.locale,
                )),
            }
        })
        .collect();

    Ok(sources)
}

/// Redis when configured and reachable, otherwise an in-process cache
pub async fn build_cache(config: &Config) -> Arc<dyn EventCache> {
    if let Some(redis_url) = config.redis_url.as_deref() {
        match RedisCache::connect(redis_url, config.cache_ttl()).await {
            Ok(cache) => return Arc::new(cache),
            Err(e) => warn!("Redis cache unavailable, using in-memory cache: {}", e),
        }
    }
    Arc::new(MemoryCache::new(config.cache_ttl()))
}

pub async fn build_service(config: &Config) -> ScheduleResult<ScheduleService> {
    let cache = build_cache(config).await;
    info!(backend = cache.name(), "Schedule cache ready");

    Ok(
        ScheduleService::new(cache, Arc::new(SystemClock), config.display_tz()?, &config.locale)
            .with_grid_options(config.grid),
    )
}
