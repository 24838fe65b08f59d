//! Shared application state and knowledge-base startup.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use secrecy::SecretString;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::channels::SlackClient;
use crate::config::EnvironmentReport;
use crate::error::{Error, PipelineError};
use crate::ingest::DocumentLoader;
use crate::pipeline::{QuestionOutcome, QuestionProcessor};
use crate::retrieval::{EmbeddingProvider, KnowledgeBase};
use crate::store::{Database, QuestionRecord};

/// Everything request handlers and channel tasks share.
pub struct AppState {
    pub processor: Arc<QuestionProcessor>,
    pub db: Arc<dyn Database>,
    pub slack: Option<Arc<SlackClient>>,
    pub signing_secret: Option<SecretString>,
    pub environment: EnvironmentReport,
    knowledge: RwLock<Option<Arc<KnowledgeBase>>>,
    initialized: AtomicBool,
}

impl AppState {
    pub fn new(
        processor: Arc<QuestionProcessor>,
        db: Arc<dyn Database>,
        environment: EnvironmentReport,
    ) -> Self {
        Self {
            processor,
            db,
            slack: None,
            signing_secret: None,
            environment,
            knowledge: RwLock::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn with_slack(mut self, slack: Arc<SlackClient>) -> Self {
        self.slack = Some(slack);
        self
    }

    pub fn with_signing_secret(mut self, secret: SecretString) -> Self {
        self.signing_secret = Some(secret);
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub async fn knowledge(&self) -> Option<Arc<KnowledgeBase>> {
        self.knowledge.read().await.clone()
    }

    /// Install a built knowledge base and mark the bot ready.
    pub async fn set_knowledge(&self, knowledge: KnowledgeBase) {
        *self.knowledge.write().await = Some(Arc::new(knowledge));
        self.initialized.store(true, Ordering::Release);
    }

    /// Answer a question and log it. Fails with `NotReady` until the
    /// knowledge base is installed.
    pub async fn ask(
        &self,
        question: &str,
        channel: &str,
        user_id: Option<&str>,
    ) -> Result<QuestionOutcome, PipelineError> {
        let knowledge = self.knowledge().await.ok_or(PipelineError::NotReady)?;
        let outcome = self.processor.respond(question, knowledge.as_ref()).await?;

        let record = QuestionRecord::new(
            channel,
            user_id.map(str::to_string),
            question.trim(),
            outcome.language.label(),
            outcome.answer.route,
        );
        if let Err(e) = self.db.record_question(&record).await {
            warn!(error = %e, "Failed to log question");
        }
        Ok(outcome)
    }
}

/// Load, chunk, embed and index the documents, then mark the bot ready.
pub async fn initialize_knowledge(
    state: &AppState,
    loader: &DocumentLoader,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Result<(), Error> {
    info!(dir = %loader.dir().display(), "Initializing knowledge base");
    let documents = loader.load().await?;
    if documents.chunks.is_empty() {
        warn!("No document chunks loaded, every retrieval will come back empty");
    }
    let knowledge = KnowledgeBase::build(documents, embedder).await?;
    info!(chunks = knowledge.chunk_count(), "✅ Bot is ready");
    state.set_knowledge(knowledge).await;
    Ok(())
}

/// Background wrapper: failures are logged and leave the bot uninitialized.
pub async fn initialize_in_background(
    state: Arc<AppState>,
    loader: DocumentLoader,
    embedder: Arc<dyn EmbeddingProvider>,
) {
    if let Err(e) = initialize_knowledge(&state, &loader, embedder).await {
        error!(error = %e, "Knowledge base initialization failed");
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::{LlmError, RetrievalError};
    use crate::ingest::Chunker;
    use crate::llm::provider::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
    use crate::llm::LanguageService;
    use crate::pipeline::{AnswerRoute, RuleBook};
    use crate::store::LibSqlBackend;

    struct EnglishLlm;

    #[async_trait]
    impl LlmProvider for EnglishLlm {
        fn model_name(&self) -> &str {
            "english"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                content: "English".to_string(),
                input_tokens: 0,
                output_tokens: 0,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }
    }

    struct UnitEmbedder;

    #[async_trait]
    impl EmbeddingProvider for UnitEmbedder {
        fn model_name(&self) -> &str {
            "unit"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    async fn state() -> AppState {
        let llm: Arc<dyn LlmProvider> = Arc::new(EnglishLlm);
        let language = LanguageService::new(llm.clone(), llm.clone(), 0.3);
        let processor = QuestionProcessor::new(RuleBook::standard(), llm, language, 0.3);
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        AppState::new(Arc::new(processor), db, EnvironmentReport::default())
    }

    #[tokio::test]
    async fn ask_before_initialization_is_not_ready() {
        let state = state().await;
        assert!(!state.is_initialized());
        assert!(matches!(
            state.ask("mortgage?", "api", None).await,
            Err(PipelineError::NotReady)
        ));
        assert_eq!(state.db.question_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn initialization_from_folder_then_ask_logs_question() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("elevate.txt"),
            "Elevate enrolls unsecured credit cards and personal loans.",
        )
        .unwrap();

        let state = state().await;
        let loader = DocumentLoader::new(dir.path(), Chunker::default());
        initialize_knowledge(&state, &loader, Arc::new(UnitEmbedder))
            .await
            .unwrap();
        assert!(state.is_initialized());
        assert_eq!(state.knowledge().await.unwrap().chunk_count(), 1);

        let outcome = state.ask("Is a mortgage ok?", "slack", Some("U1")).await.unwrap();
        assert_eq!(outcome.answer.route, AnswerRoute::HardRule);

        let logged = state.db.recent_questions(10).await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].channel, "slack");
        assert_eq!(logged[0].user_id.as_deref(), Some("U1"));
        assert_eq!(logged[0].language, "english");
        assert_eq!(logged[0].route, AnswerRoute::HardRule);
    }

    #[tokio::test]
    async fn missing_folder_leaves_bot_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(state().await);
        let loader = DocumentLoader::new(dir.path().join("missing"), Chunker::default());
        initialize_in_background(state.clone(), loader, Arc::new(UnitEmbedder)).await;
        assert!(!state.is_initialized());
    }
}
