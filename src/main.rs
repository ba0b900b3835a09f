//! Voice skill backend relaying spoken questions to Gemini
//!
//! The voice platform posts an envelope per utterance; the skill keeps a
//! short history in the session attributes and speaks the model's reply.

mod api;
mod config;
mod llm;
mod session;
mod simulate;
mod skill;

#[cfg(test)]
mod testing;

use api::{create_router, AppState};
use clap::{Parser, Subcommand};
use config::SkillConfig;
use skill::Skill;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "voice-skill", version, about = "Voice skill backend for Gemini")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the platform webhook (the default)
    Serve,
    /// Run a mock voice session against Gemini and print the replies
    Simulate(simulate::SimulateArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is normal in deployed environments
    let dotenv = dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(dotenv).await,
        Command::Simulate(args) => {
            // Replies go to stdout, logs stay out of the way on stderr
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "voice_skill=info".into()),
                )
                .with_writer(std::io::stderr)
                .init();
            simulate::run(SkillConfig::from_env()?, args).await
        }
    }
}

async fn serve(dotenv: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_skill=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    if let Some(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    // Configuration
    let config = SkillConfig::from_env()?;
    if config.endpoint.has_key() {
        tracing::info!(
            model = %config.endpoint.model(),
            timeout_secs = config.timeout.as_secs(),
            max_response_words = config.settings.max_response_words,
            max_history_turns = config.settings.max_history_turns,
            "Gemini client configured"
        );
    } else {
        tracing::warn!("GOOGLE_API_KEY is not set; every chat turn will fail");
    }

    let skill = Skill::from_config(&config)?;
    let app = create_router(AppState::new(skill));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Voice skill listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
