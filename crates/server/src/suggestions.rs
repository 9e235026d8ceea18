// ABOUTME: In-memory suggestions board holding workflow cards created from ingested articles.
// ABOUTME: Implements the feed crate's SuggestionSink; cards serialize in camelCase with their status history.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use newsdesk_feed::SuggestionSink;
use newsdesk_scraper::ScrapeResult;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Suggestion,
    Draft,
    NeedsReview,
    ManagerReview,
    Shortlisted,
    SavedForLater,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardHistoryEntry {
    pub at: String,
    pub status: CardStatus,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowCard {
    pub id: String,
    pub result: ScrapeResult,
    pub status: CardStatus,
    pub created_at: String,
    pub updated_at: String,
    pub owner: String,
    pub history: Vec<CardHistoryEntry>,
    pub source: String,
}

impl WorkflowCard {
    pub fn suggestion(result: ScrapeResult, source: &str, now: DateTime<Utc>) -> Self {
        let at = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        Self {
            id: Uuid::new_v4().to_string(),
            result,
            status: CardStatus::Suggestion,
            created_at: at.clone(),
            updated_at: at.clone(),
            owner: source.to_string(),
            history: vec![CardHistoryEntry {
                at,
                status: CardStatus::Suggestion,
                actor: source.to_string(),
                note: Some("created from feed intake".to_string()),
            }],
            source: source.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SuggestionBoard {
    cards: RwLock<Vec<WorkflowCard>>,
}

impl SuggestionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, card: WorkflowCard) {
        self.cards.write().await.push(card);
    }

    /// Cards still in the suggestion state, most recently updated first.
    pub async fn suggestions(&self) -> Vec<WorkflowCard> {
        let mut cards: Vec<WorkflowCard> = self
            .cards
            .read()
            .await
            .iter()
            .filter(|card| card.status == CardStatus::Suggestion)
            .cloned()
            .collect();
        cards.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        cards
    }

    pub async fn len(&self) -> usize {
        self.cards.read().await.len()
    }
}

#[async_trait]
impl SuggestionSink for SuggestionBoard {
    async fn suggest(&self, result: ScrapeResult, source: &str) {
        let card = WorkflowCard::suggestion(result, source, Utc::now());
        tracing::debug!(card = %card.id, url = %card.result.url, "suggestion card created");
        self.add(card).await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use newsdesk_scraper::ScrapeType;

    use super::*;

    fn result(url: &str) -> ScrapeResult {
        ScrapeResult::new(ScrapeType::Html, url, url)
    }

    #[tokio::test]
    async fn lists_only_suggestions_newest_first() {
        let board = SuggestionBoard::new();
        let older = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        board
            .add(WorkflowCard::suggestion(result("https://a.test/"), "rss-intake", older))
            .await;
        board
            .add(WorkflowCard::suggestion(result("https://b.test/"), "rss-intake", newer))
            .await;
        let mut drafted = WorkflowCard::suggestion(result("https://c.test/"), "manual", newer);
        drafted.status = CardStatus::Draft;
        board.add(drafted).await;

        let listed = board.suggestions().await;
        assert_eq!(board.len().await, 3);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].result.url, "https://b.test/");
        assert_eq!(listed[1].result.url, "https://a.test/");
    }

    #[test]
    fn card_serializes_camel_case() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let card = WorkflowCard::suggestion(result("https://a.test/"), "rss-intake", at);
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["status"], "suggestion");
        assert_eq!(json["source"], "rss-intake");
        assert_eq!(json["createdAt"], "2024-03-01T12:00:00.000Z");
        assert_eq!(json["history"][0]["actor"], "rss-intake");
        assert_eq!(json["result"]["url"], "https://a.test/");
    }
}
