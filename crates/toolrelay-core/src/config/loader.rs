//! Config loader: reads `~/.toolrelay/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.toolrelay/config.json`
//! 3. Environment variables `TOOLRELAY_<SECTION>__<FIELD>` (override JSON)
//! 4. Conventional `OPENAI_API_KEY` and `PORT` variables

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    apply_env_overrides(load_config_from_path(&config_path))
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `TOOLRELAY_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `TOOLRELAY_AGENT__MODEL`, `__MAX_TOKENS`, `__TEMPERATURE`,
///   `__MAX_TOOL_ITERATIONS`, `__SYSTEM_PROMPT`, `__JSON_MODE`
/// - `TOOLRELAY_PROVIDER__API_KEY`, `TOOLRELAY_PROVIDER__API_BASE`
/// - `TOOLRELAY_SERVER__HOST`, `__PORT`, `__STATIC_DIR`
/// - `OPENAI_API_KEY` → `provider.api_key`, `PORT` → `server.port`
fn apply_env_overrides(mut config: Config) -> Config {
    // Agent
    if let Ok(val) = std::env::var("TOOLRELAY_AGENT__MODEL") {
        config.agent.model = val;
    }
    if let Ok(val) = std::env::var("TOOLRELAY_AGENT__MAX_TOKENS") {
        if let Ok(n) = val.parse::<u32>() {
            config.agent.max_tokens = n;
        }
    }
    if let Ok(val) = std::env::var("TOOLRELAY_AGENT__TEMPERATURE") {
        if let Ok(t) = val.parse::<f64>() {
            config.agent.temperature = t;
        }
    }
    if let Ok(val) = std::env::var("TOOLRELAY_AGENT__MAX_TOOL_ITERATIONS") {
        if let Ok(n) = val.parse::<u32>() {
            config.agent.max_tool_iterations = n;
        }
    }
    if let Ok(val) = std::env::var("TOOLRELAY_AGENT__SYSTEM_PROMPT") {
        config.agent.system_prompt = val;
    }
    if let Ok(val) = std::env::var("TOOLRELAY_AGENT__JSON_MODE") {
        config.agent.json_mode = val == "true" || val == "1";
    }

    // Provider
    if let Ok(val) = std::env::var("TOOLRELAY_PROVIDER__API_KEY") {
        config.provider.api_key = val;
    }
    if let Ok(val) = std::env::var("TOOLRELAY_PROVIDER__API_BASE") {
        config.provider.api_base = Some(val);
    }

    // Server
    if let Ok(val) = std::env::var("TOOLRELAY_SERVER__HOST") {
        config.server.host = val;
    }
    if let Ok(val) = std::env::var("TOOLRELAY_SERVER__PORT") {
        if let Ok(p) = val.parse::<u16>() {
            config.server.port = p;
        }
    }
    if let Ok(val) = std::env::var("TOOLRELAY_SERVER__STATIC_DIR") {
        config.server.static_dir = val;
    }

    // Conventional names win over everything else
    if let Ok(val) = std::env::var("OPENAI_API_KEY") {
        if !val.is_empty() {
            config.provider.api_key = val;
        }
    }
    if let Ok(val) = std::env::var("PORT") {
        if let Ok(p) = val.parse::<u16>() {
            config.server.port = p;
        }
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config.agent.max_tool_iterations, 10);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "agent": {
                "model": "gpt-4o-mini",
                "maxTokens": 2048,
                "jsonMode": false
            }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(config.agent.model, "gpt-4o-mini");
        assert_eq!(config.agent.max_tokens, 2048);
        assert!(!config.agent.json_mode);
        // Default preserved
        assert_eq!(config.agent.temperature, 0.7);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_from_path(file.path());
        assert_eq!(config.agent.max_tokens, 4096);
    }

    #[test]
    fn test_load_empty_json() {
        let file = write_temp_json("{}");
        let config = load_config_from_path(file.path());
        assert_eq!(config.agent.model, "gpt-4o");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.agent.model = "gpt-4.1".to_string();
        config.provider.api_key = "sk-test".to_string();
        config.provider.api_base = Some("http://localhost:8000/v1".to_string());

        save_config(&config, Some(&path)).unwrap();

        let reloaded = load_config_from_path(&path);
        assert_eq!(reloaded.agent.model, "gpt-4.1");
        assert_eq!(reloaded.provider.api_key, "sk-test");
        assert_eq!(reloaded.provider.api_base.as_deref(), Some("http://localhost:8000/v1"));
    }

    #[test]
    fn test_saved_json_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        save_config(&Config::default(), Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert!(raw["agent"].get("maxTokens").is_some());
        assert!(raw["agent"].get("max_tokens").is_none());
    }

    // Env-mutating assertions live in one test so parallel tests don't race.
    #[test]
    fn test_env_overrides() {
        std::env::set_var("TOOLRELAY_AGENT__MODEL", "env-model");
        std::env::set_var("TOOLRELAY_AGENT__MAX_TOOL_ITERATIONS", "4");
        std::env::set_var("TOOLRELAY_SERVER__PORT", "9999");
        std::env::set_var("TOOLRELAY_PROVIDER__API_KEY", "sk-prefixed");
        std::env::set_var("OPENAI_API_KEY", "sk-conventional");

        let config = apply_env_overrides(Config::default());
        assert_eq!(config.agent.model, "env-model");
        assert_eq!(config.agent.max_tool_iterations, 4);
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.provider.api_key, "sk-conventional");

        std::env::remove_var("TOOLRELAY_AGENT__MODEL");
        std::env::remove_var("TOOLRELAY_AGENT__MAX_TOOL_ITERATIONS");
        std::env::remove_var("TOOLRELAY_SERVER__PORT");
        std::env::remove_var("TOOLRELAY_PROVIDER__API_KEY");
        std::env::remove_var("OPENAI_API_KEY");
    }
}
