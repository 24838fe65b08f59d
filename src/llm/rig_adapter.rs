//! Bridges rig's `CompletionModel` to `LlmProvider`.

use async_trait::async_trait;
use rig::agent::AgentBuilder;
use rig::completion::{Chat, CompletionModel, Message};
use tracing::debug;

use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

/// `LlmProvider` over any rig completion model.
///
/// System messages become the agent preamble, the last user message is the
/// prompt and everything in between is passed as chat history.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
}

impl<M> RigAdapter<M>
where
    M: CompletionModel + Clone + Send + Sync + 'static,
{
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }
}

/// Request pieces in the shape rig's agent wants.
#[derive(Debug, PartialEq)]
struct SplitRequest {
    preamble: Option<String>,
    history: Vec<ChatMessage>,
    prompt: String,
}

fn split_messages(messages: &[ChatMessage]) -> Result<SplitRequest, LlmError> {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let mut turns: Vec<ChatMessage> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .cloned()
        .collect();

    let prompt = match turns.pop() {
        Some(last) if last.role == Role::User => last.content,
        _ => return Err(LlmError::EmptyPrompt),
    };

    Ok(SplitRequest {
        preamble: (!system.is_empty()).then(|| system.join("\n\n")),
        history: turns,
        prompt,
    })
}

fn to_rig_message(message: &ChatMessage) -> Message {
    match message.role {
        Role::Assistant => Message::assistant(message.content.clone()),
        _ => Message::user(message.content.clone()),
    }
}

fn map_error(provider: &str, reason: String) -> LlmError {
    let lower = reason.to_lowercase();
    if lower.contains("429") || lower.contains("rate limit") {
        LlmError::RateLimited {
            provider: provider.to_string(),
            retry_after: None,
        }
    } else {
        LlmError::RequestFailed {
            provider: provider.to_string(),
            reason,
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Clone + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let split = split_messages(&request.messages)?;

        let mut builder = AgentBuilder::new(self.model.clone());
        if let Some(preamble) = split.preamble.as_deref() {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }
        let agent = builder.build();

        let history: Vec<Message> = split.history.iter().map(to_rig_message).collect();
        debug!(
            model = %self.model_name,
            history = history.len(),
            prompt_chars = split.prompt.len(),
            "Sending completion request"
        );

        let content = agent
            .chat(split.prompt.as_str(), history)
            .await
            .map_err(|e| map_error(&self.model_name, e.to_string()))?;

        Ok(CompletionResponse {
            content: content.trim().to_string(),
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Stop,
            response_id: None,
        })
    }
}
