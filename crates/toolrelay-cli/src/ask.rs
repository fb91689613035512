//! `toolrelay ask`: run one request and stream it to the terminal.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use toolrelay_agent::events::{channel, StreamUnit, DEFAULT_CHANNEL_CAPACITY};
use toolrelay_agent::StreamOrchestrator;

use crate::helpers::{render_event, Rendered};

/// Stream the answer to `message`. Fails when the request ends in an error.
pub async fn run(
    orchestrator: StreamOrchestrator,
    message: String,
    conversation_id: Option<String>,
) -> Result<()> {
    let (emitter, mut rx) = channel(DEFAULT_CHANNEL_CAPACITY);
    let orchestrator = Arc::new(orchestrator);
    let task =
        tokio::spawn(async move { orchestrator.run(message, conversation_id, emitter).await });

    let mut stdout = std::io::stdout();
    while let Some(unit) = rx.recv().await {
        let StreamUnit::Data(data) = unit else { break };
        match render_event(&data) {
            Rendered::Text(text) => {
                print!("{text}");
                stdout.flush()?;
            }
            Rendered::Line(line) => {
                eprintln!();
                eprintln!("{line}");
            }
            Rendered::Silent => {}
        }
    }
    println!();

    let record = task
        .await
        .context("request task failed")?
        .context("request failed")?;

    info!(conversation_id = %record.id, "ask complete");
    eprintln!("{} {}", "conversation:".dimmed(), record.id);
    Ok(())
}
