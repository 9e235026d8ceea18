// ABOUTME: YAML intake configuration (global relevance prompt + feed list) held by an explicitly reloadable store.
// ABOUTME: A missing or invalid file degrades to an empty feed list with a warning instead of failing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::FeedError;

pub const DEFAULT_CONFIG_PATH: &str = "config/rss-feeds.yaml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub rss_feed_url: String,
    /// Appended to the global prompt with `AND`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    /// Replaces the global prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeConfig {
    pub system_prompt: String,
    pub feeds: Vec<FeedConfig>,
}

impl IntakeConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, FeedError> {
        let config: IntakeConfig = serde_yaml::from_str(yaml).map_err(FeedError::parse)?;
        if config.system_prompt.trim().is_empty() {
            return Err(FeedError::config("Invalid RSS config structure"));
        }
        Ok(config)
    }

    /// Relevance criteria for `feed_url`.
    ///
    /// A feed `system_prompt` replaces the global prompt, a `custom_prompt`
    /// extends it; unknown feeds use the global prompt.
    pub fn prompt_for_feed(&self, feed_url: &str) -> String {
        let Some(feed) = self.feeds.iter().find(|f| f.rss_feed_url == feed_url) else {
            return self.system_prompt.clone();
        };
        if let Some(prompt) = feed.system_prompt.as_deref().filter(|p| !p.is_empty()) {
            return prompt.to_string();
        }
        if let Some(custom) = feed.custom_prompt.as_deref().filter(|p| !p.is_empty()) {
            return format!("{} AND {}", self.system_prompt, custom);
        }
        self.system_prompt.clone()
    }
}

/// Owns the intake configuration loaded from `path`.
#[derive(Debug, Clone)]
pub struct IntakeConfigStore {
    path: PathBuf,
    config: IntakeConfig,
}

impl IntakeConfigStore {
    /// Loads `path`; never fails.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let config = read_config(&path);
        Self { path, config }
    }

    /// A store over an in-memory configuration (no backing file).
    pub fn from_config(config: IntakeConfig) -> Self {
        Self {
            path: PathBuf::new(),
            config,
        }
    }

    /// Re-reads the file, replacing the held configuration.
    pub fn reload(&mut self) {
        if self.path.as_os_str().is_empty() {
            return;
        }
        self.config = read_config(&self.path);
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn prompt_for_feed(&self, feed_url: &str) -> String {
        self.config.prompt_for_feed(feed_url)
    }
}

fn read_config(path: &Path) -> IntakeConfig {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "RSS config file not found");
        return IntakeConfig::default();
    }
    let parsed = std::fs::read_to_string(path)
        .map_err(FeedError::from)
        .and_then(|raw| IntakeConfig::from_yaml_str(&raw));
    match parsed {
        Ok(config) => {
            tracing::info!(feeds = config.feeds.len(), path = %path.display(), "loaded RSS config");
            config
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "error loading RSS config");
            IntakeConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const YAML: &str = r#"
system_prompt: housing
feeds:
  - rss_feed_url: https://a.test/rss
  - rss_feed_url: https://b.test/rss
    custom_prompt: transit
  - rss_feed_url: https://c.test/rss
    system_prompt: elections
    custom_prompt: ignored
"#;

    #[test]
    fn prompt_resolution() {
        let config = IntakeConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.prompt_for_feed("https://a.test/rss"), "housing");
        assert_eq!(config.prompt_for_feed("https://b.test/rss"), "housing AND transit");
        assert_eq!(config.prompt_for_feed("https://c.test/rss"), "elections");
        assert_eq!(config.prompt_for_feed("https://unknown.test/"), "housing");
    }

    #[test]
    fn invalid_structures_are_rejected() {
        assert!(IntakeConfig::from_yaml_str("feeds: []").is_err());
        assert!(IntakeConfig::from_yaml_str("system_prompt: x").is_err());
        assert!(IntakeConfig::from_yaml_str("system_prompt: ''\nfeeds: []").is_err());
    }

    #[test]
    fn missing_or_bad_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = IntakeConfigStore::load(dir.path().join("nope.yaml"));
        assert!(store.config().feeds.is_empty());

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "feeds: [").unwrap();
        assert_eq!(IntakeConfigStore::load(&bad).config(), &IntakeConfig::default());
    }

    #[test]
    fn reload_picks_up_changes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "system_prompt: one\nfeeds: []\n").unwrap();
        let mut store = IntakeConfigStore::load(file.path());
        assert_eq!(store.config().system_prompt, "one");

        std::fs::write(file.path(), YAML).unwrap();
        assert_eq!(store.config().system_prompt, "one");
        store.reload();
        assert_eq!(store.config().feeds.len(), 3);
    }
}
