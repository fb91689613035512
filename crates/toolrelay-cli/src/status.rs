//! `toolrelay status`: show configuration and provider status.

use anyhow::Result;
use colored::Colorize;

use toolrelay_core::config::{get_config_path, load_config};
use toolrelay_providers::http_provider::DEFAULT_API_BASE;

/// Run the status command.
pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();

    println!();
    println!("{}", "⇄ Toolrelay Status".cyan().bold());
    println!();

    // Config
    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".red().to_string()
        }
    );

    // Model
    println!("  {:<18} {}", "Model:".bold(), config.agent.model);
    println!(
        "  {:<18} {} | max_tokens: {} | json_mode: {}",
        "Parameters:".bold(),
        format!("temp: {}", config.agent.temperature).dimmed(),
        format!("{}", config.agent.max_tokens).dimmed(),
        format!("{}", config.agent.json_mode).dimmed(),
    );
    println!(
        "  {:<18} {}",
        "Max iterations:".bold(),
        config.agent.max_tool_iterations
    );

    // Provider
    println!();
    println!(
        "  {:<18} {}",
        "API base:".bold(),
        config.provider.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    );
    let key_status = if config.provider.is_configured() {
        format!("{} (key set)", "✓".green())
    } else {
        format!("{}", "· not configured (set OPENAI_API_KEY)".dimmed())
    };
    println!("  {:<18} {}", "API key:".bold(), key_status);

    // Server
    println!();
    println!(
        "  {:<18} http://{}:{}",
        "Server:".bold(),
        config.server.host,
        config.server.port
    );
    println!("  {:<18} {}", "Static dir:".bold(), config.server.static_dir);
    println!();

    Ok(())
}
