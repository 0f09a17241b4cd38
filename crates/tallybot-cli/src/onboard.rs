//! `tallybot onboard` — write a default config file and the data directories.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use tallybot_core::config::{save_config, Config};

/// Run the onboard command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config_path = crate::config_path_or_default(config_path);

    println!();
    println!("{}", "🧮 Tallybot — Setup".cyan().bold());
    println!();

    let created = write_default_config(&config_path)?;
    if created {
        println!("  {} created config at {}", "✓".green(), config_path.display());
    } else {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    }

    let history_dir = tallybot_core::utils::get_data_path().join("history");
    std::fs::create_dir_all(&history_dir)
        .with_context(|| format!("failed to create {}", history_dir.display()))?;

    println!();
    println!(
        "{}",
        "Next: set providers.gemini.apiKey (or GEMINI_API_KEY) and run `tallybot ask`.".dimmed()
    );
    println!();
    Ok(())
}

/// Write `Config::default()` unless a file already exists. Returns whether it wrote.
fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
