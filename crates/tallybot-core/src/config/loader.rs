//! Config loader — reads `~/.tallybot/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.tallybot/config.json`
//! 3. Environment variables `TALLYBOT_<SECTION>__<FIELD>` (override JSON)
//! 4. `GEMINI_API_KEY` / `OPENAI_API_KEY`, only where no key is set yet
//!
//! Only the process entry point should call into this module; the agent and
//! providers receive credentials explicitly.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, ProviderConfig};

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the given path (or the default) + env vars.
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
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply process environment overrides on top of a loaded config.
fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides read through `lookup`.
///
/// Supported keys:
/// - `TALLYBOT_AGENT__PROVIDER` → `agent.provider`
/// - `TALLYBOT_AGENT__MODEL` → `agent.model`
/// - `TALLYBOT_AGENT__SYSTEM_PROMPT` → `agent.system_prompt`
/// - `TALLYBOT_AGENT__MAX_TOKENS` → `agent.max_tokens`
/// - `TALLYBOT_AGENT__TEMPERATURE` → `agent.temperature`
/// - `TALLYBOT_AGENT__MAX_TURNS` → `agent.max_turns`
/// - `TALLYBOT_AGENT__HISTORY` → `agent.history`
/// - `TALLYBOT_PROVIDERS__<NAME>__API_KEY` → `providers.<name>.api_key`
/// - `TALLYBOT_PROVIDERS__<NAME>__API_BASE` → `providers.<name>.api_base`
/// - `TALLYBOT_RETRY__MAX_RETRIES` → `retry.max_retries`
/// - `TALLYBOT_TIMEOUT_SECS` → `timeout_secs`
fn apply_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("TALLYBOT_AGENT__PROVIDER") {
        config.agent.provider = val;
    }
    if let Some(val) = lookup("TALLYBOT_AGENT__MODEL") {
        config.agent.model = val;
    }
    if let Some(val) = lookup("TALLYBOT_AGENT__SYSTEM_PROMPT") {
        config.agent.system_prompt = val;
    }
    if let Some(val) = lookup("TALLYBOT_AGENT__MAX_TOKENS") {
        if let Ok(n) = val.parse::<u32>() {
            config.agent.max_tokens = n;
        }
    }
    if let Some(val) = lookup("TALLYBOT_AGENT__TEMPERATURE") {
        if let Ok(t) = val.parse::<f64>() {
            config.agent.temperature = t;
        }
    }
    if let Some(val) = lookup("TALLYBOT_AGENT__MAX_TURNS") {
        if let Ok(n) = val.parse::<u32>() {
            config.agent.max_turns = n;
        }
    }
    if let Some(val) = lookup("TALLYBOT_AGENT__HISTORY") {
        match val.parse() {
            Ok(policy) => config.agent.history = policy,
            Err(e) => warn!("Ignoring TALLYBOT_AGENT__HISTORY: {}", e),
        }
    }

    apply_provider_env(&mut config.providers.gemini, "GEMINI", &lookup);
    apply_provider_env(&mut config.providers.openai, "OPENAI", &lookup);

    if let Some(val) = lookup("TALLYBOT_RETRY__MAX_RETRIES") {
        if let Ok(n) = val.parse::<u32>() {
            config.retry.max_retries = n;
        }
    }
    if let Some(val) = lookup("TALLYBOT_TIMEOUT_SECS") {
        if let Ok(n) = val.parse::<u64>() {
            config.timeout_secs = n;
        }
    }

    config
}

/// Apply env var overrides for a single provider.
fn apply_provider_env<F>(provider: &mut ProviderConfig, name: &str, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(&format!("TALLYBOT_PROVIDERS__{name}__API_KEY")) {
        provider.api_key = val;
    }
    if let Some(val) = lookup(&format!("TALLYBOT_PROVIDERS__{name}__API_BASE")) {
        provider.api_base = Some(val);
    }
    if !provider.is_configured() {
        if let Some(val) = lookup(&format!("{name}_API_KEY")) {
            provider.api_key = val;
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
