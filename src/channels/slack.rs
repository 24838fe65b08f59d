//! Slack Web API client and the app-mention responder.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::slack_events::AppMention;
use crate::error::{ChannelError, PipelineError};
use crate::pipeline::prompts::processing_notice;
use crate::state::AppState;

/// Longest text sent in one `chat.postMessage` call (Slack truncates at 4000).
pub const SLACK_MAX_MESSAGE_LENGTH: usize = 3900;

const SLACK_API_BASE: &str = "https://slack.com/api";

const APOLOGY: &str =
    "⚠️ Sorry, something went wrong while answering your question. Please try again in a moment.";
const NOT_READY: &str =
    "⏳ I'm still loading the policy documents. Please ask again in a minute.";

#[derive(Debug, Deserialize)]
struct SlackApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Thin client for the Web API methods the bot uses.
pub struct SlackClient {
    client: reqwest::Client,
    bot_token: SecretString,
    app_token: Option<SecretString>,
    api_base: String,
}

impl SlackClient {
    pub fn new(bot_token: SecretString, app_token: Option<SecretString>) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChannelError::Http(e.to_string()))?;
        Ok(Self {
            client,
            bot_token,
            app_token,
            api_base: SLACK_API_BASE.to_string(),
        })
    }

    /// Point the client at another API root (tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn has_app_token(&self) -> bool {
        self.app_token.is_some()
    }

    async fn call(
        &self,
        method: &str,
        token: &SecretString,
        body: serde_json::Value,
    ) -> Result<SlackApiResponse, ChannelError> {
        let send_err = |reason: String| ChannelError::SendFailed {
            name: "slack".to_string(),
            reason: format!("{method}: {reason}"),
        };

        let response = self
            .client
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| send_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(send_err(format!("HTTP {status}")));
        }

        let parsed: SlackApiResponse = response
            .json()
            .await
            .map_err(|e| send_err(format!("invalid response: {e}")))?;
        if !parsed.ok {
            return Err(send_err(
                parsed.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }
        Ok(parsed)
    }

    /// Post `text` to a channel, optionally in a thread. Long text goes out
    /// as several consecutive messages.
    pub async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<(), ChannelError> {
        for part in split_message(text, SLACK_MAX_MESSAGE_LENGTH) {
            let mut body = json!({ "channel": channel, "text": part });
            if let Some(ts) = thread_ts {
                body["thread_ts"] = json!(ts);
            }
            self.call("chat.postMessage", &self.bot_token, body).await?;
        }
        debug!(channel, "Posted Slack message");
        Ok(())
    }

    /// Ask for a fresh Socket Mode websocket URL (`apps.connections.open`).
    pub async fn open_socket_url(&self) -> Result<String, ChannelError> {
        let app_token = self.app_token.as_ref().ok_or_else(|| ChannelError::StartupFailed {
            name: "slack".to_string(),
            reason: "SLACK_APP_TOKEN is not set".to_string(),
        })?;
        let response = self
            .call("apps.connections.open", app_token, json!({}))
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "slack".to_string(),
                reason: e.to_string(),
            })?;
        response.url.ok_or_else(|| ChannelError::StartupFailed {
            name: "slack".to_string(),
            reason: "apps.connections.open returned no url".to_string(),
        })
    }
}

/// Split text into parts of at most `max_len` bytes, preferring newline
/// then space boundaries and never cutting through a character.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            parts.push(remaining.to_string());
            break;
        }

        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        let window = &remaining[..limit];
        let split_at = match window.rfind('\n').or_else(|| window.rfind(' ')) {
            Some(0) | None => limit,
            Some(i) => i,
        };
        // A single character wider than max_len.
        let split_at = if split_at == 0 {
            remaining.chars().next().map_or(remaining.len(), char::len_utf8)
        } else {
            split_at
        };

        parts.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    parts
}

/// Answer a mention in its thread: a processing notice first, then the
/// answer, or an apology if answering failed.
pub async fn respond_to_mention(state: &AppState, mention: AppMention) {
    let Some(slack) = state.slack.as_ref() else {
        warn!(channel = %mention.channel, "Mention received but no Slack bot token configured");
        return;
    };
    let question = mention.question();
    if question.is_empty() {
        debug!(channel = %mention.channel, "Ignoring mention without a question");
        return;
    }
    let thread = mention.reply_thread();

    info!(channel = %mention.channel, user = ?mention.user, "Answering Slack mention");
    if let Err(e) = slack
        .post_message(
            &mention.channel,
            Some(thread),
            &processing_notice(&mention.user_mention()),
        )
        .await
    {
        error!(error = %e, "Failed to post processing notice");
    }

    let reply = match state
        .ask(&question, "slack", mention.user.as_deref())
        .await
    {
        Ok(outcome) => outcome.text(),
        Err(PipelineError::NotReady) => NOT_READY.to_string(),
        Err(e) => {
            error!(error = %e, channel = %mention.channel, "Failed to answer question");
            APOLOGY.to_string()
        }
    };

    if let Err(e) = slack.post_message(&mention.channel, Some(thread), &reply).await {
        error!(error = %e, channel = %mention.channel, "Failed to post answer");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
    use serde_json::Value;
    use tokio::net::TcpListener;

    use super::*;

    type Seen = Arc<Mutex<Vec<(String, Value)>>>;

    async fn spawn_slack(seen: Seen, ok: bool) -> String {
        async fn record(
            State((seen, ok)): State<(Seen, bool)>,
            headers: HeaderMap,
            Json(body): Json<Value>,
        ) -> Json<Value> {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            seen.lock().unwrap().push((auth, body));
            if ok {
                Json(json!({"ok": true, "url": "wss://example.test/link"}))
            } else {
                Json(json!({"ok": false, "error": "channel_not_found"}))
            }
        }

        let router = Router::new()
            .route("/api/{method}", post(record))
            .with_state((seen, ok));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    #[tokio::test]
    async fn post_message_sends_thread_and_token() {
        let seen: Seen = Arc::default();
        let base = spawn_slack(seen.clone(), true).await;
        let client = SlackClient::new(SecretString::from("xoxb-1"), None)
            .unwrap()
            .with_api_base(base);

        client.post_message("C1", Some("1.5"), "hello").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "Bearer xoxb-1");
        assert_eq!(seen[0].1, json!({"channel": "C1", "text": "hello", "thread_ts": "1.5"}));
    }

    #[tokio::test]
    async fn long_message_is_posted_in_parts() {
        let seen: Seen = Arc::default();
        let base = spawn_slack(seen.clone(), true).await;
        let client = SlackClient::new(SecretString::from("xoxb-1"), None)
            .unwrap()
            .with_api_base(base);

        let text = format!("{}\n{}", "a".repeat(3000), "b".repeat(3000));
        client.post_message("C1", None, &text).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].1.get("thread_ts").is_none());
        assert_eq!(seen[1].1["text"], json!("b".repeat(3000)));
    }

    /// Replies "English" to everything, or fails every call.
    struct ScriptedLlm {
        fail: bool,
    }

    #[async_trait::async_trait]
    impl crate::llm::LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: crate::llm::CompletionRequest,
        ) -> Result<crate::llm::CompletionResponse, crate::error::LlmError> {
            if self.fail {
                return Err(crate::error::LlmError::RequestFailed {
                    provider: "scripted".to_string(),
                    reason: "offline".to_string(),
                });
            }
            Ok(crate::llm::CompletionResponse {
                content: "English".to_string(),
                input_tokens: 0,
                output_tokens: 0,
                finish_reason: crate::llm::FinishReason::Stop,
                response_id: None,
            })
        }
    }

    struct NoDocumentsEmbedder;

    #[async_trait::async_trait]
    impl crate::retrieval::EmbeddingProvider for NoDocumentsEmbedder {
        fn model_name(&self) -> &str {
            "none"
        }

        async fn embed(
            &self,
            texts: &[String],
        ) -> Result<Vec<Vec<f32>>, crate::error::RetrievalError> {
            Ok(texts.iter().map(|_| vec![0.0, 1.0]).collect())
        }
    }

    async fn app_state(slack: SlackClient, llm_fails: bool) -> AppState {
        use crate::llm::{LanguageService, LlmProvider};
        use crate::pipeline::{QuestionProcessor, RuleBook};
        use crate::store::{Database, LibSqlBackend};

        let llm: Arc<dyn LlmProvider> = Arc::new(ScriptedLlm { fail: llm_fails });
        let language = LanguageService::new(llm.clone(), llm.clone(), 0.3);
        let processor = QuestionProcessor::new(RuleBook::standard(), llm, language, 0.3);
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        AppState::new(Arc::new(processor), db, Default::default()).with_slack(Arc::new(slack))
    }

    async fn unready_state(slack: SlackClient) -> AppState {
        app_state(slack, true).await
    }

    async fn ready_state(slack: SlackClient, llm_fails: bool) -> AppState {
        let state = app_state(slack, llm_fails).await;
        let knowledge = crate::retrieval::KnowledgeBase::build(
            crate::ingest::LoadedDocuments::default(),
            Arc::new(NoDocumentsEmbedder),
        )
        .await
        .unwrap();
        state.set_knowledge(knowledge).await;
        state
    }

    async fn mock_client() -> (Seen, SlackClient) {
        let seen: Seen = Arc::default();
        let base = spawn_slack(seen.clone(), true).await;
        let client = SlackClient::new(SecretString::from("xoxb-1"), None)
            .unwrap()
            .with_api_base(base);
        (seen, client)
    }

    fn mention(text: &str, thread_ts: Option<&str>) -> AppMention {
        serde_json::from_value(json!({
            "type": "app_mention",
            "text": text,
            "channel": "C9",
            "ts": "10.1",
            "user": "U7",
            "thread_ts": thread_ts,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn mention_before_ready_gets_notice_then_loading_reply() {
        let seen: Seen = Arc::default();
        let base = spawn_slack(seen.clone(), true).await;
        let client = SlackClient::new(SecretString::from("xoxb-1"), None)
            .unwrap()
            .with_api_base(base);
        let state = unready_state(client).await;

        respond_to_mention(&state, mention("<@UBOT> Is Oportun accepted?", Some("9.9"))).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1["text"], json!(processing_notice("<@U7>")));
        assert_eq!(seen[0].1["thread_ts"], json!("9.9"));
        assert_eq!(seen[1].1["text"], json!(NOT_READY));
        assert_eq!(seen[1].1["thread_ts"], json!("9.9"));
    }

    #[tokio::test]
    async fn ready_bot_posts_bilingual_answer_in_new_thread() {
        use crate::pipeline::{Answer, AnswerRoute, RuleBook, RuleDecision};

        let (seen, client) = mock_client().await;
        let state = ready_state(client, false).await;

        respond_to_mention(&state, mention("<@UBOT> Is a mortgage ok?", None)).await;

        let Some(RuleDecision::HardRule { english, spanish, .. }) =
            RuleBook::standard().evaluate("is a mortgage ok?")
        else {
            panic!("mortgage should hit a hard rule");
        };
        let expected = Answer::new(english, spanish, AnswerRoute::HardRule).render();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1["thread_ts"], json!("10.1"));
        assert_eq!(seen[1].1["channel"], json!("C9"));
        assert_eq!(seen[1].1["thread_ts"], json!("10.1"));
        assert_eq!(seen[1].1["text"], json!(expected));
        drop(seen);

        let logged = state.db.recent_questions(1).await.unwrap();
        assert_eq!(logged[0].channel, "slack");
        assert_eq!(logged[0].user_id.as_deref(), Some("U7"));
    }

    #[tokio::test]
    async fn llm_failure_posts_apology_in_thread() {
        let (seen, client) = mock_client().await;
        let state = ready_state(client, true).await;

        respond_to_mention(&state, mention("<@UBOT> Is a mortgage ok?", Some("9.9"))).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].1["text"], json!(APOLOGY));
        assert_eq!(seen[1].1["thread_ts"], json!("9.9"));
    }

    #[tokio::test]
    async fn empty_mention_posts_nothing() {
        let seen: Seen = Arc::default();
        let base = spawn_slack(seen.clone(), true).await;
        let client = SlackClient::new(SecretString::from("xoxb-1"), None)
            .unwrap()
            .with_api_base(base);
        let state = unready_state(client).await;

        respond_to_mention(&state, mention("<@UBOT>  ", None)).await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn slack_error_becomes_send_failed() {
        let base = spawn_slack(Arc::default(), false).await;
        let client = SlackClient::new(SecretString::from("xoxb-1"), None)
            .unwrap()
            .with_api_base(base);
        match client.post_message("C404", None, "hi").await.unwrap_err() {
            ChannelError::SendFailed { reason, .. } => assert!(reason.contains("channel_not_found")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn socket_url_uses_app_token() {
        let seen: Seen = Arc::default();
        let base = spawn_slack(seen.clone(), true).await;
        let client = SlackClient::new(SecretString::from("xoxb-1"), Some(SecretString::from("xapp-1")))
            .unwrap()
            .with_api_base(base);

        assert_eq!(client.open_socket_url().await.unwrap(), "wss://example.test/link");
        assert_eq!(seen.lock().unwrap()[0].0, "Bearer xapp-1");
    }

    #[tokio::test]
    async fn socket_url_needs_app_token() {
        let client = SlackClient::new(SecretString::from("xoxb-1"), None).unwrap();
        assert!(!client.has_app_token());
        assert!(matches!(
            client.open_socket_url().await.unwrap_err(),
            ChannelError::StartupFailed { .. }
        ));
    }

    #[test]
    fn split_message_short() {
        assert_eq!(split_message("Hello", 3900), vec!["Hello"]);
    }

    #[test]
    fn split_message_prefers_newline() {
        let msg = format!("{}\n{} {}", "a".repeat(20), "b".repeat(5), "c".repeat(5));
        let parts = split_message(&msg, 25);
        assert_eq!(parts, vec!["a".repeat(20), format!("{} {}", "b".repeat(5), "c".repeat(5))]);
    }

    #[test]
    fn split_message_falls_back_to_space() {
        let msg = format!("{} {}", "a".repeat(2000), "b".repeat(3000));
        let parts = split_message(&msg, 3900);
        assert_eq!(parts, vec!["a".repeat(2000), "b".repeat(3000)]);
    }

    #[test]
    fn split_message_hard_cut() {
        let parts = split_message(&"a".repeat(5000), 3900);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 3900);
        assert_eq!(parts[1].len(), 1100);
    }

    #[test]
    fn split_message_respects_char_boundaries() {
        // Each ❌ is three bytes.
        let msg = "❌".repeat(10);
        let parts = split_message(&msg, 8);
        assert!(parts.iter().all(|p| p.len() <= 8));
        assert_eq!(parts.concat(), msg);
        assert_eq!(parts[0], "❌❌");
    }
}
