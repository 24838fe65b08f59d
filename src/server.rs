//! HTTP surface: health and status probes, the Events API webhook and a
//! small ops API.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::channels::{SlackEvent, SlackPayload, respond_to_mention, verify_signature};
use crate::codex::search_codex;
use crate::error::PipelineError;
use crate::state::AppState;

const DEFAULT_QUESTION_LIMIT: usize = 20;
const MAX_QUESTION_LIMIT: usize = 200;

/// All routes, with request tracing.
pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/test", get(test))
        .route("/slack/events", post(slack_events))
        .route("/api/ask", post(ask))
        .route("/api/codex", get(codex))
        .route("/api/questions", get(questions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn presence(set: bool) -> &'static str {
    if set { "✅ Set" } else { "❌ Missing" }
}

fn now_seconds() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

async fn home(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "success",
        "message": "Policy bot is running",
        "bot_initialized": state.is_initialized(),
        "endpoints": {
            "health": "/health",
            "status": "/status",
            "webhook": "/slack/events",
        }
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": now_seconds(),
        "bot_initialized": state.is_initialized(),
    }))
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let knowledge = state.knowledge().await;
    let env = state.environment;
    Json(json!({
        "status": "success",
        "bot_initialized": state.is_initialized(),
        "chunks_loaded": knowledge.as_ref().map_or(0, |kb| kb.chunk_count()),
        "vector_index_ready": knowledge.as_ref().is_some_and(|kb| kb.is_indexed()),
        "documents": knowledge.as_ref().map(|kb| json!(kb.documents())).unwrap_or_else(|| json!({})),
        "hard_rules": state.processor.rules().hard_rule_count(),
        "disqualified_creditors": state.processor.rules().disqualified_count(),
        "environment": {
            "slack_bot_token": presence(env.slack_bot_token),
            "slack_app_token": presence(env.slack_app_token),
            "openai_api_key": presence(env.openai_api_key),
        }
    }))
}

async fn test(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.knowledge().await {
        Some(kb) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "message": "Bot is ready and operational",
                "chunks_available": kb.chunk_count(),
                "vector_index_ready": kb.is_indexed(),
            })),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "message": "Bot not yet initialized",
                "retry_after": "30 seconds",
            })),
        ),
    }
}

async fn slack_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if !is_json {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid content type"})),
        );
    }

    if let Some(secret) = &state.signing_secret {
        let timestamp = header_str(&headers, "x-slack-request-timestamp");
        let signature = header_str(&headers, "x-slack-signature");
        if let Err(e) = verify_signature(secret, timestamp, &body, signature, Utc::now().timestamp())
        {
            warn!(error = %e, "Rejected Slack request");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid signature"})),
            );
        }
    }

    let payload: SlackPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Unparseable Slack event body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Invalid JSON payload"})),
            );
        }
    };

    match payload {
        SlackPayload::UrlVerification { challenge } => {
            (StatusCode::OK, Json(json!({"challenge": challenge})))
        }
        SlackPayload::EventCallback { event, event_id } => {
            if let Some(retry) = headers.get("x-slack-retry-num") {
                debug!(?retry, event_id = ?event_id, "Acknowledging Slack retry without answering");
            } else if let SlackEvent::AppMention(mention) = event {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    respond_to_mention(&state, mention).await;
                });
            }
            (StatusCode::OK, Json(json!({"status": "event_received"})))
        }
        SlackPayload::Unsupported => (StatusCode::OK, Json(json!({"status": "event_received"}))),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    user: Option<String>,
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> impl IntoResponse {
    match state.ask(&request.question, "api", request.user.as_deref()).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "answer": outcome.text(),
                "english": outcome.answer.english,
                "spanish": outcome.answer.spanish,
                "route": outcome.answer.route,
                "language": outcome.language.label(),
                "sources": outcome.answer.sources,
            })),
        ),
        Err(PipelineError::NotReady) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "message": "Bot not yet initialized",
                "retry_after": "30 seconds",
            })),
        ),
        Err(PipelineError::EmptyQuestion) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Question must not be empty"})),
        ),
        Err(e) => {
            error!(error = %e, "API question failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": e.to_string()})),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct CodexQuery {
    #[serde(default)]
    q: String,
}

async fn codex(Query(query): Query<CodexQuery>) -> impl IntoResponse {
    if query.q.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing query parameter 'q'"})),
        );
    }
    let matches = search_codex(&query.q);
    (
        StatusCode::OK,
        Json(json!({
            "query": query.q,
            "count": matches.len(),
            "matches": matches,
        })),
    )
}

#[derive(Debug, Deserialize)]
struct QuestionsQuery {
    limit: Option<usize>,
}

async fn questions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuestionsQuery>,
) -> impl IntoResponse {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_QUESTION_LIMIT)
        .clamp(1, MAX_QUESTION_LIMIT);

    let recent = state.db.recent_questions(limit).await;
    let total = state.db.question_count().await;
    match (recent, total) {
        (Ok(recent), Ok(total)) => {
            let rows: Vec<_> = recent
                .iter()
                .map(|r| {
                    json!({
                        "id": r.id,
                        "channel": r.channel,
                        "user_id": r.user_id,
                        "question": r.question,
                        "language": r.language,
                        "route": r.route,
                        "created_at": r.created_at,
                    })
                })
                .collect();
            (
                StatusCode::OK,
                Json(json!({"total": total, "questions": rows})),
            )
        }
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "Failed to read question log");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to read question log"})),
            )
        }
    }
}
