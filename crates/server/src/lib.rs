// ABOUTME: HTTP surface of the newsroom backend: scrape, manual edit, feed check and suggestion listing.
// ABOUTME: Handlers are thin; scraping and ingestion live in the scraper and feed crates.

pub mod config;
pub mod error;
pub mod state;
pub mod suggestions;
pub mod telemetry;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap},
    response::Json,
    routing::{get, post, put},
    Router,
};
use newsdesk_feed::CheckSummary;
use newsdesk_scraper::{EditPayload, RequestType, ScrapeOptions, ScrapeRequest, ScrapeResult};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::AppError;
pub use state::AppState;
pub use suggestions::{CardStatus, SuggestionBoard, WorkflowCard};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/scrape", post(scrape_handler))
        .route("/api/scrape/{id}", put(edit_handler))
        .route("/api/rss/check", post(rss_check_handler))
        .route("/api/rss/suggestions", get(suggestions_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Scrape body; every field is optional so a missing url is a 400, not a parse error.
#[derive(Debug, Default, Deserialize)]
struct ScrapeBody {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "type")]
    request_type: Option<RequestType>,
    #[serde(default)]
    options: Option<ScrapeOptions>,
}

/// Checks `Authorization: Bearer <secret>` when a secret is configured.
fn authorize(headers: &HeaderMap, secret: Option<&str>) -> Result<(), AppError> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    match token {
        Some(token) if !token.is_empty() && token == secret => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<Option<T>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<T>>(body)
        .map_err(|err| AppError::BadRequest(format!("Invalid JSON body: {}", err)))
}

async fn scrape_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ScrapeResult>, AppError> {
    authorize(&headers, state.client.secret())?;

    let body: ScrapeBody = parse_json(&body)?.unwrap_or_default();
    let url = body
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing url".to_string()))?;

    let request = ScrapeRequest {
        url,
        request_type: body.request_type,
        options: body.options.unwrap_or_default(),
    };
    Ok(Json(state.client.scrape(request).await))
}

async fn edit_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ScrapeResult>, AppError> {
    authorize(&headers, state.client.secret())?;

    if id.trim().is_empty() {
        return Err(AppError::BadRequest("Missing id parameter".to_string()));
    }
    let payload: EditPayload = parse_json(&body)?
        .ok_or_else(|| AppError::BadRequest("Missing payload".to_string()))?;

    let result = state.client.save_edit(&id, payload).await?;
    tracing::info!(id = %result.id, url = %result.url, "manual edit saved");
    Ok(Json(result))
}

async fn rss_check_handler(State(state): State<AppState>) -> Json<CheckSummary> {
    tracing::info!("manual RSS check triggered");
    Json(state.intake.run_pass().await)
}

async fn suggestions_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "cards": state.board.suggestions().await }))
}
