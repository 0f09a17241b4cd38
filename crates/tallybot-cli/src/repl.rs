//! `tallybot chat` — readline loop over the agent.
//!
//! Each line starts a fresh run with an empty history; only the readline
//! history is kept, under `~/.tallybot/history/cli_history`.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use tallybot_core::config::Config;

use crate::helpers::{self, ConsoleObserver};

const PROMPT: &str = "You: ";
const HISTORY_LIMIT: usize = 1000;

/// Words that end the session (case-insensitive).
const QUIT_WORDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// What to do with one line of input.
#[derive(Debug, PartialEq, Eq)]
enum LineAction<'a> {
    Skip,
    Quit,
    Ask(&'a str),
}

fn classify(line: &str) -> LineAction<'_> {
    let line = line.trim();
    if line.is_empty() {
        LineAction::Skip
    } else if QUIT_WORDS.iter().any(|w| w.eq_ignore_ascii_case(line)) {
        LineAction::Quit
    } else {
        LineAction::Ask(line)
    }
}

/// Run the interactive loop until EOF, Ctrl-C, or a quit word.
pub async fn run(config: &Config, max_turns: u32) -> Result<()> {
    // Surface a missing key before showing the prompt.
    let model = crate::build_agent(config)?.model().to_string();
    helpers::print_banner(&model);

    let history = history_file();
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(HISTORY_LIMIT)?;
    if editor.load_history(&history).is_ok() {
        debug!(path = %history.display(), "loaded REPL history");
    }

    let observer = ConsoleObserver::new(true);
    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let question = match classify(&line) {
            LineAction::Skip => continue,
            LineAction::Quit => {
                println!("\nGoodbye! 👋");
                break;
            }
            LineAction::Ask(question) => question,
        };
        let _ = editor.add_history_entry(question);

        match crate::run_once(config, question, max_turns, &observer).await {
            Ok(outcome) => helpers::print_outcome(&outcome, false),
            Err(e) => eprintln!("\n{} {e:#}\n", "❌ Error:".red().bold()),
        }
    }

    if let Some(dir) = history.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    if let Err(e) = editor.save_history(&history) {
        debug!(error = %e, "could not save REPL history");
    }
    Ok(())
}

fn history_file() -> PathBuf {
    tallybot_core::utils::get_data_path()
        .join("history")
        .join("cli_history")
}
