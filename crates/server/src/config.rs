// ABOUTME: Server configuration read from environment variables, with defaults for every setting.
// ABOUTME: Also selects the persistence provider: Supabase when credentials exist, the disabled store otherwise.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use newsdesk_feed::config::DEFAULT_CONFIG_PATH;
use newsdesk_feed::dedup::DEFAULT_CACHE_PATH;
use newsdesk_feed::scheduler::DEFAULT_SCHEDULE;
use newsdesk_scraper::options::{DEFAULT_CACHE_TTL_MS, DEFAULT_USER_AGENT};
use newsdesk_scraper::{DisabledStore, ResultStore, SupabaseConfig, SupabaseStore};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub secret: Option<String>,
    pub cache_ttl_ms: i64,
    pub return_html_default: bool,
    pub user_agent: String,
    pub supabase: Option<SupabaseConfig>,
    pub require_persistence: bool,
    pub rss_config_path: PathBuf,
    pub rss_cache_path: PathBuf,
    pub scheduler_enabled: bool,
    pub schedule: String,
    pub feed_concurrency: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            secret: None,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            return_html_default: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            supabase: None,
            require_persistence: false,
            rss_config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            rss_cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            scheduler_enabled: false,
            schedule: DEFAULT_SCHEDULE.to_string(),
            feed_concurrency: 1,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| parse_flag(key, get(key));
        let defaults = Self::default();

        let config = Self {
            listen_addr: get("NEWSDESK_LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            secret: get("SCRAPER_SECRET"),
            cache_ttl_ms: match get("SCRAPER_CACHE_TTL_MS") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("SCRAPER_CACHE_TTL_MS is not a number: {:?}", raw))?,
                None => defaults.cache_ttl_ms,
            },
            return_html_default: flag("SCRAPER_RETURN_HTML_DEFAULT")?
                .unwrap_or(defaults.return_html_default),
            user_agent: get("SCRAPER_USER_AGENT").unwrap_or(defaults.user_agent),
            supabase: SupabaseConfig::from_parts(
                get("SUPABASE_URL"),
                get("SUPABASE_KEY"),
                get("SUPABASE_BUCKET"),
            ),
            require_persistence: flag("SCRAPER_REQUIRE_PERSISTENCE")?.unwrap_or(false),
            rss_config_path: get("RSS_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.rss_config_path),
            rss_cache_path: get("RSS_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.rss_cache_path),
            scheduler_enabled: flag("RSS_SCHEDULER_ENABLED")?.unwrap_or(false),
            schedule: get("RSS_SCHEDULE").unwrap_or(defaults.schedule),
            feed_concurrency: match get("RSS_FEED_CONCURRENCY") {
                Some(raw) => raw
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("RSS_FEED_CONCURRENCY is not a number: {:?}", raw))?
                    .max(1),
                None => defaults.feed_concurrency,
            },
        };
        Ok(config)
    }

    /// Picks the persistence provider for the scraper client.
    pub fn build_store(&self) -> Result<Arc<dyn ResultStore>> {
        match &self.supabase {
            Some(supabase) => {
                tracing::info!(url = %supabase.url, bucket = ?supabase.bucket, "persistence provider: supabase");
                Ok(Arc::new(SupabaseStore::new(supabase.clone())))
            }
            None if self.require_persistence => {
                bail!("SCRAPER_REQUIRE_PERSISTENCE is set but SUPABASE_URL/SUPABASE_KEY are missing")
            }
            None => {
                tracing::info!("persistence provider: disabled");
                Ok(Arc::new(DisabledStore::new()))
            }
        }
    }
}

fn parse_flag(key: &str, value: Option<String>) -> Result<Option<bool>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        other => Err(anyhow!("{} must be a boolean, got {:?}", key, other)),
    }
}
