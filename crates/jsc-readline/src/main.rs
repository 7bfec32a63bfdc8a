use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use tokio::time::timeout;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use jsc_core::config::{self, ConsoleConfig};
use jsc_core::{ConsoleBridge, ConsoleSession, Sandbox};

mod render;
mod sandbox;

use render::{ConsoleHelper, OutputCursor};
use sandbox::DemoSandbox;

/// How long the REPL waits for `:load` fetches before giving the prompt back.
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "jsc")]
#[command(about = "JSC - interactive developer console", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to ~/.config/jsc/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter used when JSC_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Start in multi-line mode
    #[arg(long)]
    multiline: bool,
}

/// Sends tracing output to a daily rolling file under `~/.config/jsc/logs`.
///
/// The terminal belongs to the console, so nothing is logged to stdout.
fn init_tracing(level: &str) -> Option<WorkerGuard> {
    let log_dir = config::config_dir().ok()?.join("logs");
    let file_appender = tracing_appender::rolling::daily(log_dir, "jsc.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_env("JSC_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;
    Some(guard)
}

fn print_new(cursor: &mut OutputCursor, session: &ConsoleSession) {
    for line in cursor.advance(session.output().lines()) {
        println!("{}", line);
    }
}

/// Waits for in-flight `:load` fetches, printing each result as it lands.
async fn await_loads(cursor: &mut OutputCursor, session: &mut ConsoleSession) {
    while session.pending_loads() > 0 {
        match timeout(LOAD_TIMEOUT, session.next_load()).await {
            Ok(true) => print_new(cursor, session),
            Ok(false) => break,
            Err(_) => {
                tracing::warn!(pending = session.pending_loads(), "Timed out waiting for scripts");
                println!(
                    "{}",
                    "Still loading scripts; results will appear later.".yellow()
                );
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(&cli.log_level);

    let mut config = match &cli.config {
        Some(path) => ConsoleConfig::load_from(path),
        None => ConsoleConfig::load(),
    }
    .context("Failed to load configuration")?;
    if cli.multiline {
        config.start_multiline = true;
    }
    tracing::info!(?config, "Starting console");

    let mut session = ConsoleSession::new(
        |bridge: ConsoleBridge| -> Box<dyn Sandbox> { Box::new(DemoSandbox::new(bridge)) },
        &config,
    );
    session.show();

    // ===== REPL Setup =====
    let multiline = Arc::new(AtomicBool::new(session.is_multiline()));
    let mut rl: Editor<ConsoleHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ConsoleHelper::new(multiline.clone())));

    println!("{}", "=== JSC ===".bright_magenta().bold());
    println!(
        "{}",
        "Type ':help' for commands, '.mode' to switch input mode, or 'quit' to exit."
            .bright_black()
    );
    println!();

    let mut cursor = OutputCursor::default();

    // ===== Main REPL Loop =====
    loop {
        session.pump();
        print_new(&mut cursor, &session);

        let prompt = if session.is_multiline() { ">>> " } else { "> " };
        match rl.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                match trimmed {
                    "quit" | "exit" => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    ".mode" => {
                        session.toggle_mode(None);
                        multiline.store(session.is_multiline(), Ordering::Relaxed);
                        println!(
                            "{}",
                            format!("Input mode: {:?}", session.mode()).bright_black()
                        );
                    }
                    ".resize" => {
                        let resizable = session.toggle_resizable();
                        println!("{}", format!("Resizable: {}", resizable).bright_black());
                    }
                    _ => {
                        if session.run(&line).is_accepted() {
                            let _ = rl.add_history_entry(trimmed);
                        }
                        print_new(&mut cursor, &session);
                        await_loads(&mut cursor, &mut session).await;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                tracing::error!(error = %err, "Readline failed");
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}
