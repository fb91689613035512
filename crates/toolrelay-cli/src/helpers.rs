//! Shared CLI helpers: path expansion, event rendering, version banner.

use std::path::PathBuf;

use colored::Colorize;
use serde_json::Value;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Print the banner shown when a command starts.
pub fn print_banner(mode: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!(
        "{}  v{}  {}",
        "⇄ Toolrelay".cyan().bold(),
        version.dimmed(),
        mode.dimmed()
    );
    println!();
}

/// How one outbound unit should appear in a terminal.
#[derive(Debug, PartialEq)]
pub enum Rendered {
    /// Streamed text, printed inline without a newline.
    Text(String),
    /// A full line for stderr (tool calls, errors).
    Line(String),
    /// Nothing to show.
    Silent,
}

/// Render one serialized event for the terminal.
pub fn render_event(data: &str) -> Rendered {
    let Ok(event) = serde_json::from_str::<Value>(data) else {
        return Rendered::Silent;
    };

    match event.get("type").and_then(Value::as_str) {
        Some("content") => Rendered::Text(
            event["content"].as_str().unwrap_or_default().to_string(),
        ),
        Some("tool_call") => Rendered::Line(format!(
            "{} {}({}) → {}",
            "⚙".yellow(),
            event["tool"].as_str().unwrap_or("?").yellow().bold(),
            event["arguments"],
            event["result"].to_string().dimmed()
        )),
        Some("error") => Rendered::Line(format!(
            "{} {}",
            "✗".red().bold(),
            event["error"].as_str().unwrap_or("unknown error").red()
        )),
        _ => Rendered::Silent,
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
