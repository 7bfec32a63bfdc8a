//! Builtin system commands (`:help`, `:load`, `:clear`, `:purge`, `:reset`).
//!
//! These are always available. Anything typed with the leading `:` is
//! looked up here instead of being sent to the sandbox.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Serialize;
use strum::{Display, EnumString};

use crate::error::{ConsoleError, Result};
use crate::format::escape_html;

/// Prefix that marks an input as a system command.
pub const SENTINEL: char = ':';

/// Returns true if `input` (already trimmed) is a system command.
pub fn is_system_command(input: &str) -> bool {
    input.starts_with(SENTINEL)
}

/// The known system commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SystemCommand {
    Clear,
    Reset,
    Purge,
    Load,
    Help,
}

/// A parsed `:command arg...` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: SystemCommand,
    /// Every whitespace-separated token, including the command itself.
    pub tokens: Vec<String>,
}

impl Invocation {
    /// Parses a trimmed input starting with [`SENTINEL`].
    ///
    /// Unknown names yield [`ConsoleError::InvalidCommand`].
    pub fn parse(input: &str) -> Result<Self> {
        let tokens: Vec<String> = input.split_whitespace().map(str::to_string).collect();
        let name = tokens
            .first()
            .and_then(|first| first.strip_prefix(SENTINEL))
            .ok_or_else(|| ConsoleError::InvalidCommand(input.to_string()))?;

        let command = name
            .parse::<SystemCommand>()
            .map_err(|_| ConsoleError::InvalidCommand(name.to_string()))?;

        Ok(Self { command, tokens })
    }

    /// Arguments after the command name.
    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or_default()
    }

    /// The tokens re-joined with single spaces, as echoed back.
    pub fn echo_text(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Maps a `:load` argument to a URL: known library names resolve through
/// `libraries`, anything else is taken as a URL.
pub fn resolve_load_target(target: &str, libraries: &HashMap<String, String>) -> String {
    libraries
        .get(target)
        .cloned()
        .unwrap_or_else(|| target.to_string())
}

// ============================================================================
// Help
// ============================================================================

/// A builtin system command as shown in `:help`.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltinCommand {
    /// Command name (without the leading `:`)
    pub name: &'static str,
    /// Usage format (e.g. ":load <url>")
    pub usage: &'static str,
    /// Human-readable description
    pub description: &'static str,
}

impl BuiltinCommand {
    pub const fn new(name: &'static str, usage: &'static str, description: &'static str) -> Self {
        Self {
            name,
            usage,
            description,
        }
    }
}

static BUILTIN_COMMANDS: OnceLock<Vec<BuiltinCommand>> = OnceLock::new();

/// Returns all builtin system commands in help order.
pub fn builtin_commands() -> &'static [BuiltinCommand] {
    BUILTIN_COMMANDS.get_or_init(|| {
        vec![
            BuiltinCommand::new("help", ":help", "Display help information."),
            BuiltinCommand::new("load", ":load <url>", "Load external JS file."),
            BuiltinCommand::new("clear", ":clear", "Clear the console."),
            BuiltinCommand::new("purge", ":purge", "Clear command history."),
            BuiltinCommand::new("reset", ":reset", "Clear all sandboxed variables."),
        ]
    })
}

/// Keyboard shortcuts listed in `:help`.
pub const SHORTCUTS: &[(&str, &str)] = &[
    ("`", "Show or hide the console."),
    ("CTRL + SHIFT + ↑", "Change console mode (single or multi-line)."),
    ("CTRL + SHIFT + ↓", "Toggle resizing of the multi-line input."),
    ("CTRL + ALT + T", "Toggle console translucency."),
    ("↑ / ↓", "Browse command history (single-line mode)."),
    ("CTRL + ↑ / ↓", "Browse command history."),
    ("ENTER", "Run the command (single-line mode)."),
    ("CTRL + ENTER", "Run the command."),
];

/// The static `:help` text, already HTML-safe.
pub fn help_text() -> &'static str {
    static HELP: OnceLock<String> = OnceLock::new();
    HELP.get_or_init(|| {
        let mut lines: Vec<String> = builtin_commands()
            .iter()
            .map(|cmd| escape_html(&format!("{:<12}-- {}", cmd.usage, cmd.description)))
            .collect();
        lines.push(String::new());
        lines.extend(
            SHORTCUTS
                .iter()
                .map(|(keys, description)| {
                    escape_html(&format!("{:<17}-- {}", keys, description))
                }),
        );
        lines.join("\n")
    })
}
