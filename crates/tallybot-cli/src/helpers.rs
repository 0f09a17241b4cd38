//! Shared CLI helpers — path expansion, run tracing, answer printing, banner.

use std::path::PathBuf;

use colored::Colorize;
use serde_json::Value;

use tallybot_agent::{RunObserver, RunOutcome};
use tallybot_core::types::{ToolCallRequest, ToolCallResult};
use tallybot_core::utils::truncate_string;

/// Longest tool result echoed to the terminal.
const MAX_RESULT_CHARS: usize = 200;

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

// ─────────────────────────────────────────────
// Run tracing
// ─────────────────────────────────────────────

/// Prints each step of a run as it happens.
pub struct ConsoleObserver {
    verbose: bool,
}

impl ConsoleObserver {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn start(&self) {
        if self.verbose {
            println!("\n{}\n", "--- Starting Conversation ---".dimmed());
        }
    }
}

impl RunObserver for ConsoleObserver {
    fn on_iteration(&self, turn: u32, max_turns: u32) {
        if self.verbose {
            println!("{} {}", "| ITERATION".bold(), format!("{turn}/{max_turns}").bold());
        }
    }

    fn on_tool_call(&self, call: &ToolCallRequest) {
        if self.verbose {
            let args = Value::Object(call.arguments.clone());
            println!(
                "| > Executing Tool: {} with args {}",
                call.name.yellow(),
                args.to_string().dimmed()
            );
        }
    }

    fn on_tool_result(&self, result: &ToolCallResult) {
        if self.verbose {
            let shown = truncate_string(&result.content, MAX_RESULT_CHARS);
            if result.content.contains("\"error\"") {
                println!("| > Tool Result: {}", shown.red());
            } else {
                println!("| > Tool Result: {}", shown.green());
            }
        }
    }

    fn on_final(&self, text: &str) {
        if self.verbose {
            println!("| > Final Answer: {}", text.trim());
        }
    }
}

// ─────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────

/// Print the outcome of a run. `quiet` prints the bare answer only.
pub fn print_outcome(outcome: &RunOutcome, quiet: bool) {
    if quiet {
        println!("{}", outcome.text().trim());
        return;
    }
    println!();
    match outcome {
        RunOutcome::Completed { text, turns } => {
            println!("{}", "🧮 Tallybot".cyan().bold());
            println!("{}", text.trim());
            println!("{}", format!("({turns} model call(s))").dimmed());
        }
        RunOutcome::MaxTurnsReached { .. } => {
            println!("{}", outcome.text().yellow().bold());
        }
    }
    println!();
}

/// Print the header for one demo question.
pub fn print_case_header(number: usize, title: &str) {
    println!();
    println!(
        "{}",
        format!("=============== TEST CASE {number}: {title} ===============")
            .cyan()
            .bold()
    );
}

/// Print the banner shown at REPL start.
pub fn print_banner(model: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!(
        "{}  v{}  {}",
        "🧮 Tallybot".cyan().bold(),
        version.dimmed(),
        model.dimmed()
    );
    println!("{}", "Ask a question, or \"exit\" to quit.".dimmed());
    println!();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
