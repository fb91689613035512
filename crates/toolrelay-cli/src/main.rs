//! Toolrelay CLI: entry point.
//!
//! # Commands
//!
//! - `toolrelay serve`: HTTP + SSE server
//! - `toolrelay ask -m MESSAGE`: one request streamed to the terminal
//! - `toolrelay onboard`: write the default config file
//! - `toolrelay status`: show configuration and provider status

mod ask;
mod helpers;
mod onboard;
mod server;
mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use toolrelay_agent::{default_registry, StreamOrchestrator};
use toolrelay_core::config::{load_config, Config};
use toolrelay_core::store::InMemoryConversationStore;
use toolrelay_providers::HttpProvider;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// ⇄ Toolrelay: streaming LLM tool-call relay
#[derive(Parser)]
#[command(name = "toolrelay", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (chat SSE endpoint, conversation lookup, static files)
    Serve {
        /// Listen host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory of static files to serve
        #[arg(long)]
        static_dir: Option<String>,

        #[command(flatten)]
        agent: AgentArgs,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,

        /// Emit logs as JSON lines
        #[arg(long, default_value_t = false)]
        json_logs: bool,
    },

    /// Send one message and stream the answer
    Ask {
        /// The message to send
        #[arg(short, long)]
        message: String,

        /// Reuse a conversation id instead of generating one
        #[arg(long)]
        conversation_id: Option<String>,

        #[command(flatten)]
        agent: AgentArgs,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Initialize configuration
    Onboard,

    /// Show configuration and provider status
    Status,
}

/// Agent overrides shared by `serve` and `ask`.
#[derive(clap::Args)]
struct AgentArgs {
    /// Upstream model (overrides config)
    #[arg(long)]
    model: Option<String>,

    /// Maximum upstream turns per request (overrides config)
    #[arg(long)]
    max_iterations: Option<u32>,
}

impl AgentArgs {
    fn apply(self, config: &mut Config) {
        if let Some(model) = self.model {
            config.agent.model = model;
        }
        if let Some(max) = self.max_iterations {
            config.agent.max_tool_iterations = max;
        }
    }
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            static_dir,
            agent,
            logs,
            json_logs,
        } => {
            init_logging(logs, json_logs);
            let mut config = load_config(None);
            agent.apply(&mut config);
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let static_dir = static_dir.unwrap_or_else(|| config.server.static_dir.clone());

            let orchestrator = build_orchestrator(&config)?;
            server::run(orchestrator, &host, port, &static_dir).await
        }
        Commands::Ask {
            message,
            conversation_id,
            agent,
            logs,
        } => {
            init_logging(logs, false);
            let mut config = load_config(None);
            agent.apply(&mut config);

            let orchestrator = build_orchestrator(&config)?;
            ask::run(orchestrator, message, conversation_id).await
        }
        Commands::Onboard => onboard::run(),
        Commands::Status => status::run(),
    }
}

/// Build a `StreamOrchestrator` from the loaded configuration.
pub fn build_orchestrator(config: &Config) -> Result<StreamOrchestrator> {
    if !config.provider.is_configured() {
        warn!("no API key configured; set OPENAI_API_KEY or run `toolrelay onboard`");
    }

    let provider = HttpProvider::new(&config.provider, &config.agent.model)
        .context("failed to create LLM provider")?;

    Ok(StreamOrchestrator::new(
        Arc::new(provider),
        Arc::new(default_registry()),
        Arc::new(InMemoryConversationStore::new()),
        &config.agent,
    ))
}

/// Initialize tracing/logging. `RUST_LOG` wins when set.
fn init_logging(verbose: bool, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("toolrelay=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}
