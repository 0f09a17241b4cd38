//! Tallybot CLI — entry point.
//!
//! # Commands
//!
//! - `tallybot ask MESSAGE` — one run of the agent loop
//! - `tallybot chat` — interactive REPL, one fresh run per line
//! - `tallybot demo` — the multiplication and salary walkthroughs
//! - `tallybot onboard` — write a default config file
//! - `tallybot status` — show configuration and provider status

mod helpers;
mod onboard;
mod repl;
mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use tallybot_agent::{default_registry, run_with_observer, Agent, AgentSettings, RunOutcome};
use tallybot_core::config::{load_config, Config};
use tallybot_providers::create_provider;

use crate::helpers::ConsoleObserver;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 🧮 Tallybot — a tool-calling agent that does its arithmetic properly
#[derive(Parser)]
#[command(name = "tallybot", version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.tallybot/config.json)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// The question for the agent
        message: String,

        /// Maximum model calls before giving up (default from config)
        #[arg(long)]
        max_turns: Option<u32>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,

        /// Print only the final answer
        #[arg(short, long, default_value_t = false)]
        quiet: bool,
    },

    /// Interactive REPL
    Chat {
        /// Maximum model calls per message (default from config)
        #[arg(long)]
        max_turns: Option<u32>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Run the built-in demo questions
    Demo {
        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Write a default config file
    Onboard,

    /// Show configuration and provider status
    Status,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref().map(helpers::expand_tilde);

    match cli.command {
        Commands::Ask {
            message,
            max_turns,
            logs,
            quiet,
        } => {
            init_logging(logs);
            let config = load_config(config_path.as_deref());
            let max_turns = max_turns.unwrap_or(config.agent.max_turns);
            ask(&config, &message, max_turns, quiet).await
        }
        Commands::Chat { max_turns, logs } => {
            init_logging(logs);
            let config = load_config(config_path.as_deref());
            let max_turns = max_turns.unwrap_or(config.agent.max_turns);
            repl::run(&config, max_turns).await
        }
        Commands::Demo { logs } => {
            init_logging(logs);
            let config = load_config(config_path.as_deref());
            demo(&config).await
        }
        Commands::Onboard => onboard::run(config_path.as_deref()),
        Commands::Status => status::run(config_path.as_deref()),
    }
}

// ─────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────

async fn ask(config: &Config, message: &str, max_turns: u32, quiet: bool) -> Result<()> {
    let outcome = run_once(config, message, max_turns, &ConsoleObserver::new(!quiet)).await?;
    helpers::print_outcome(&outcome, quiet);
    Ok(())
}

const DEMO_CASES: &[(&str, &str)] = &[
    ("COMPLEX MATH", "What is 157.09 multiplied by 493.89?"),
    (
        "MULTI-STEP LOGIC",
        "If my salary is 50,000 and I get a 10% raise, then I spend 5,000 on a holiday, what is my new balance?",
    ),
];

async fn demo(config: &Config) -> Result<()> {
    let observer = ConsoleObserver::new(true);
    for (index, (title, question)) in DEMO_CASES.iter().enumerate() {
        helpers::print_case_header(index + 1, title);
        let outcome = run_once(config, question, config.agent.max_turns, &observer).await?;
        helpers::print_outcome(&outcome, false);
    }
    Ok(())
}

/// One run with a fresh agent (empty history).
pub async fn run_once(
    config: &Config,
    message: &str,
    max_turns: u32,
    observer: &ConsoleObserver,
) -> Result<RunOutcome> {
    let mut agent = build_agent(config)?;
    info!(model = agent.model(), max_turns, "starting run");
    observer.start();
    run_with_observer(&mut agent, message, max_turns, observer)
        .await
        .context("agent run failed")
}

/// Build an `Agent` with the built-in tools from the loaded configuration.
pub fn build_agent(config: &Config) -> Result<Agent> {
    let provider = create_provider(config).context("failed to create LLM provider")?;
    Ok(Agent::new(
        provider,
        default_registry(),
        AgentSettings::from_config(config),
    ))
}

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins when set; otherwise warnings only, or debug output for
/// the tallybot crates with `--logs`.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("tallybot_core=debug,tallybot_agent=debug,tallybot_providers=debug,tallybot=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Resolved config path for display: the `--config` override or the default.
pub fn config_path_or_default(path: Option<&Path>) -> PathBuf {
    path.map(PathBuf::from)
        .unwrap_or_else(tallybot_core::config::get_config_path)
}
