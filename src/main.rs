//! Wayfarer - terminal travel assistant
//!
//! An interactive REPL that moderates each message, keeps a bounded
//! conversation window and relays it to a hosted chat-completion endpoint.

mod config;
mod history;
mod llm;
mod moderation;
mod runtime;
mod state_machine;
mod system_prompt;
mod terminal;
mod transcript;

use config::{ChatConfig, ConfigError};
use history::ConversationHistory;
use llm::{completion_client, ChatCompletionService, RetryPolicy};
use moderation::{CategoryPolicy, ModerationGate, OpenAiModerationService};
use runtime::{CtrlC, ProductionRuntime};
use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use terminal::ReadlineTerminal;
use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transcript::{FileTranscript, TranscriptError};

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Transcript(#[from] TranscriptError),
    #[error("failed to initialise the terminal: {0}")]
    Terminal(#[from] rustyline::error::ReadlineError),
}

#[tokio::main]
async fn main() -> ExitCode {
    // Credentials may come from a .env file during local use
    dotenvy::dotenv().ok();

    let config = match ChatConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to start: {e}");
            eprintln!("Please check your OpenAI credentials and settings and try again.");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.log_path);
    tracing::info!(config = ?config, "Configuration loaded");

    let mut session = match build_session(&config) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("Failed to start: {e}");
            return ExitCode::FAILURE;
        }
    };

    session.run().await;
    ExitCode::SUCCESS
}

/// JSON logs to the log file, or stderr when it cannot be opened
fn init_logging(path: &Path) {
    let writer = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => BoxMakeWriter::new(Mutex::new(file)),
        Err(e) => {
            eprintln!("Cannot open log file {}: {e}; logging to stderr", path.display());
            BoxMakeWriter::new(std::io::stderr)
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wayfarer=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(writer),
        )
        .init();
}

fn build_session(config: &ChatConfig) -> Result<ProductionRuntime, StartupError> {
    let provider = ChatCompletionService::new(
        config.api_key.clone(),
        config.target.clone(),
        config.completion_timeout,
    )?;
    let llm = completion_client(Arc::new(provider), RetryPolicy::default());

    let moderation = OpenAiModerationService::new(
        config.moderation_api_key.clone(),
        config.moderation_target.clone(),
        config.moderation_timeout,
    )?;
    let gate = ModerationGate::new(
        Arc::new(moderation),
        CategoryPolicy::new(config.moderation_categories.clone()),
    );

    let history = ConversationHistory::new(
        system_prompt::persona_message(config.system_prompt.as_deref()),
        config.max_history,
    );

    let transcript = FileTranscript::open(&config.transcript_path)?;
    tracing::info!(path = %transcript.path().display(), "Transcript opened");

    let terminal = ReadlineTerminal::new()?;

    Ok(ProductionRuntime::new(
        history,
        gate,
        llm,
        config.sampling,
        transcript,
        terminal,
        CtrlC,
    ))
}
