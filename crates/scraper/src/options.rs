// ABOUTME: Scraper configuration (ScraperConfig) and the fluent ClientBuilder used to construct a Client.
// ABOUTME: Holds cache TTL, auth secret, user agent, per-kind timeouts, proxy base, rule registry and store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::client::Client;
use crate::persistence::{DisabledStore, ResultStore};
use crate::rules::{load_builtin_rules, RuleRegistry};

/// Desktop Chrome user agent sent by default.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default cache TTL: seven days.
pub const DEFAULT_CACHE_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

pub const DEFAULT_PROXY_BASE: &str = "https://r.jina.ai/";

/// Configuration for the scraping pipeline.
#[derive(Clone)]
pub struct ScraperConfig {
    /// Cache freshness window; `<= 0` disables cache lookups.
    pub cache_ttl_ms: i64,
    /// Bearer token expected by the HTTP surface, if any.
    pub secret: Option<String>,
    pub user_agent: String,
    /// Whether `content.html` is returned when the request does not say.
    pub return_html_default: bool,
    pub html_timeout: Duration,
    pub pdf_timeout: Duration,
    pub readability_proxy_base: String,
    pub allow_private_networks: bool,
    pub http_client: Option<reqwest::Client>,
    pub headers: HashMap<String, String>,
    pub rules: RuleRegistry,
    pub store: Arc<dyn ResultStore>,
}

impl fmt::Debug for ScraperConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScraperConfig")
            .field("cache_ttl_ms", &self.cache_ttl_ms)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("return_html_default", &self.return_html_default)
            .field("html_timeout", &self.html_timeout)
            .field("pdf_timeout", &self.pdf_timeout)
            .field("readability_proxy_base", &self.readability_proxy_base)
            .field("allow_private_networks", &self.allow_private_networks)
            .field("headers", &self.headers)
            .field("rules", &self.rules.len())
            .field("store", &self.store.name())
            .finish()
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            secret: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            return_html_default: true,
            html_timeout: Duration::from_secs(30),
            pdf_timeout: Duration::from_secs(45),
            readability_proxy_base: DEFAULT_PROXY_BASE.to_string(),
            allow_private_networks: false,
            http_client: None,
            headers: HashMap::new(),
            rules: load_builtin_rules(),
            store: Arc::new(DisabledStore::new()),
        }
    }
}

/// Builder for constructing Client instances with custom configuration.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    config: ScraperConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ScraperConfig::default(),
        }
    }

    /// Set the cache TTL in milliseconds (`<= 0` disables the cache).
    pub fn cache_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.config.cache_ttl_ms = ttl_ms;
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.config.secret = Some(secret.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn return_html_default(mut self, value: bool) -> Self {
        self.config.return_html_default = value;
        self
    }

    /// Set the timeout for HTML fetches and AMP fallbacks.
    pub fn html_timeout(mut self, timeout: Duration) -> Self {
        self.config.html_timeout = timeout;
        self
    }

    /// Set the timeout for PDF downloads and the readability proxy.
    pub fn pdf_timeout(mut self, timeout: Duration) -> Self {
        self.config.pdf_timeout = timeout;
        self
    }

    pub fn readability_proxy_base(mut self, base: impl Into<String>) -> Self {
        self.config.readability_proxy_base = base.into();
        self
    }

    /// Allow or disallow requests to private networks.
    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.config.allow_private_networks = allow;
        self
    }

    /// Use a custom HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.config.http_client = Some(client);
        self
    }

    /// Add a custom header to all page requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(key.into(), value.into());
        self
    }

    /// Replace the domain field rule registry.
    pub fn rules(mut self, rules: RuleRegistry) -> Self {
        rules.precompile();
        self.config.rules = rules;
        self
    }

    /// Inject the persistence provider.
    pub fn store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.config.store = store;
        self
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn build(self) -> Client {
        Client::new(self.config)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
