// ABOUTME: Shared application state handed to every axum handler.
// ABOUTME: build() wires the scraper client, persistence provider, intake pass and suggestions board from config.

use std::sync::Arc;

use anyhow::Result;
use newsdesk_feed::{DedupCache, Intake, IntakeConfigStore};
use newsdesk_scraper::Client;

use crate::config::ServerConfig;
use crate::suggestions::SuggestionBoard;

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<Client>,
    pub intake: Intake,
    pub board: Arc<SuggestionBoard>,
}

impl AppState {
    pub fn new(client: Arc<Client>, intake: Intake, board: Arc<SuggestionBoard>) -> Self {
        Self {
            client,
            intake,
            board,
        }
    }

    pub async fn build(config: &ServerConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .cache_ttl_ms(config.cache_ttl_ms)
            .user_agent(config.user_agent.clone())
            .return_html_default(config.return_html_default)
            .store(config.build_store()?);
        if let Some(secret) = &config.secret {
            builder = builder.secret(secret.clone());
        }
        let client = Arc::new(builder.build());
        let board = Arc::new(SuggestionBoard::new());

        let intake = Intake::new(
            IntakeConfigStore::load(&config.rss_config_path),
            DedupCache::open(&config.rss_cache_path).await,
            client.clone(),
            board.clone(),
        )
        .with_feed_concurrency(config.feed_concurrency);

        Ok(Self::new(client, intake, board))
    }
}
