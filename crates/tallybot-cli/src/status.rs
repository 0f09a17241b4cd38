//! `tallybot status` — show configuration and provider status.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use tallybot_core::config::{load_config, Config, HistoryPolicy};
use tallybot_providers::ProviderKind;

/// Run the status command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let path = crate::config_path_or_default(config_path);
    let config = load_config(Some(&path));

    println!();
    println!("{}", "🧮 Tallybot Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        path.display(),
        if path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".red().to_string()
        }
    );

    println!("  {:<18} {}", "Model:".bold(), config.agent.model);
    println!("  {:<18} {}", "Backend:".bold(), backend_label(&config));
    println!(
        "  {:<18} {} | {} | {}",
        "Parameters:".bold(),
        format!("temp: {}", config.agent.temperature).dimmed(),
        format!("max_tokens: {}", config.agent.max_tokens).dimmed(),
        format!("max_turns: {}", config.agent.max_turns).dimmed(),
    );
    println!(
        "  {:<18} {}",
        "History:".bold(),
        match config.agent.history {
            HistoryPolicy::ModelTurnsOnly => "model turns only",
            HistoryPolicy::Full => "full",
        }
    );
    println!(
        "  {:<18} {} retries, {}s timeout",
        "Network:".bold(),
        config.retry.max_retries,
        config.timeout_secs
    );

    println!();
    println!("  {}", "Providers:".bold());
    for kind in [ProviderKind::Gemini, ProviderKind::OpenAi] {
        let status = match config.providers.get_by_name(kind.name()) {
            Some(p) if p.is_configured() => format!("{} (key set)", "✓".green()),
            Some(p) if p.api_base.is_some() => format!("{} (custom base, no key)", "·".yellow()),
            _ => format!("{}", "· not configured".dimmed()),
        };
        println!("    {:<20} {}", kind.name(), status);
    }
    println!();

    Ok(())
}

/// Which backend the config selects, and whether it was inferred.
fn backend_label(config: &Config) -> String {
    match ProviderKind::resolve(config) {
        Ok(kind) if config.agent.provider.trim().is_empty() => {
            format!("{} (inferred from model)", kind.name())
        }
        Ok(kind) => kind.name().to_string(),
        Err(e) => format!("{}", e.to_string().red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_inferred_from_model() {
        let config = Config::default();
        assert_eq!(backend_label(&config), "gemini (inferred from model)");
    }

    #[test]
    fn backend_explicit() {
        let mut config = Config::default();
        config.agent.provider = "openai".into();
        assert_eq!(backend_label(&config), "openai");
    }

    #[test]
    fn backend_unknown() {
        let mut config = Config::default();
        config.agent.provider = "llama".into();
        assert!(backend_label(&config).contains("llama"));
    }
}
