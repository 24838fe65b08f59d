use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use policy_bot::channels::{SlackClient, socket_mode};
use policy_bot::config::BotConfig;
use policy_bot::ingest::{Chunker, DocumentLoader};
use policy_bot::llm::{LanguageService, create_provider};
use policy_bot::pipeline::{QuestionProcessor, RuleBook};
use policy_bot::retrieval::{CachedEmbedder, EmbeddingProvider, OpenAiEmbedder};
use policy_bot::server::routes;
use policy_bot::state::{AppState, initialize_in_background};
use policy_bot::store::{Database, LibSqlBackend};

/// Console logging, plus a daily-rolling file when a log directory is set.
/// The returned guard must live as long as the process.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "policy-bot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    let config = BotConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export OPENAI_API_KEY=sk-...");
        std::process::exit(1);
    });

    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("🤖 Policy Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Answer model: {}", config.models.answer_model);
    eprintln!("   Detect model: {}", config.models.detect_model);
    eprintln!("   Embed model: {}", config.models.embed_model);
    eprintln!("   Documents: {}", config.retrieval.documents_dir.display());
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   HTTP: http://{}", config.bind_addr());

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?,
    );

    // ── LLM providers ────────────────────────────────────────────────────
    let answer_llm = create_provider(&config.llm_config(&config.models.answer_model))?;
    let detect_llm = create_provider(&config.llm_config(&config.models.detect_model))?;
    let language = LanguageService::new(detect_llm, answer_llm.clone(), config.models.temperature);
    let processor = QuestionProcessor::new(
        RuleBook::standard(),
        answer_llm,
        language,
        config.models.temperature,
    )
    .with_top_k(config.retrieval.top_k);

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(CachedEmbedder::new(
        Arc::new(OpenAiEmbedder::new(
            config.models.openai_base_url.clone(),
            config.models.openai_api_key.clone(),
            config.models.embed_model.clone(),
        )?),
        Arc::clone(&db),
    ));

    // ── Slack ────────────────────────────────────────────────────────────
    let slack = match &config.slack.bot_token {
        Some(token) => Some(Arc::new(SlackClient::new(
            token.clone(),
            config.slack.app_token.clone(),
        )?)),
        None => None,
    };

    let mut state = AppState::new(Arc::new(processor), db, config.environment_report());
    if let Some(slack) = &slack {
        state = state.with_slack(Arc::clone(slack));
    }
    if let Some(secret) = &config.slack.signing_secret {
        state = state.with_signing_secret(secret.clone());
    }
    let state = Arc::new(state);

    let mut modes = vec!["events webhook"];
    if config.slack.signing_secret.is_none() {
        eprintln!("   Warning: SLACK_SIGNING_SECRET not set, webhook requests are not verified");
    }
    match &slack {
        Some(client) if client.has_app_token() => {
            modes.push("socket mode");
            tokio::spawn(socket_mode::run(Arc::clone(&state), Arc::clone(client)));
        }
        Some(_) => {}
        None => eprintln!("   Warning: SLACK_BOT_TOKEN not set, answers cannot be posted to Slack"),
    }
    eprintln!("   Slack: {}\n", modes.join(", "));

    // ── Knowledge base (background) ──────────────────────────────────────
    let loader = DocumentLoader::new(
        config.retrieval.documents_dir.clone(),
        Chunker::new(config.retrieval.max_chunk_words),
    );
    tokio::spawn(initialize_in_background(Arc::clone(&state), loader, embedder));

    // ── HTTP ─────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;
    tracing::info!(addr = %config.bind_addr(), "HTTP server listening");
    axum::serve(listener, routes(state)).await?;
    Ok(())
}
