//! `toolrelay onboard`: write the default configuration file.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use toolrelay_core::config::{get_config_path, save_config, Config};

/// Run the onboard command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "⇄ Toolrelay — Setup".cyan().bold());
    println!();

    let config_path = get_config_path();
    if ensure_config(&config_path)? {
        println!("  {} created config at {}", "✓".green(), config_path.display());
    } else {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    }

    println!();
    println!(
        "{}",
        "  Setup complete! Set OPENAI_API_KEY, then run `toolrelay serve`.".green()
    );
    println!();

    Ok(())
}

/// Write a default config at `path` unless one exists. Returns whether it wrote.
fn ensure_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))?;
    Ok(true)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
