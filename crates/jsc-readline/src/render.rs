//! Terminal side of the console: the rustyline helper and colored output.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::{ColoredString, Colorize};
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Context, Helper};

use jsc_core::commands::{SENTINEL, builtin_commands};
use jsc_core::{Category, OutputLine};

/// Host-only commands handled by the REPL itself.
pub const HOST_COMMANDS: [&str; 3] = [".mode", ".resize", "quit"];

/// rustyline helper providing `:command` completion, hints and highlighting.
///
/// In multi-line mode a submission is only complete once it ends with an
/// empty line.
#[derive(Clone)]
pub struct ConsoleHelper {
    commands: Vec<String>,
    multiline: Arc<AtomicBool>,
}

impl ConsoleHelper {
    pub fn new(multiline: Arc<AtomicBool>) -> Self {
        let commands = builtin_commands()
            .iter()
            .map(|cmd| format!("{}{}", SENTINEL, cmd.name))
            .chain(HOST_COMMANDS.iter().map(|cmd| cmd.to_string()))
            .collect();
        Self {
            commands,
            multiline,
        }
    }

    fn candidates<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.commands
            .iter()
            .filter(move |cmd| !prefix.is_empty() && cmd.starts_with(prefix))
    }
}

impl Helper for ConsoleHelper {}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if line.contains(char::is_whitespace) {
            return Ok((0, vec![]));
        }

        let candidates = self
            .candidates(line)
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd.clone(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ConsoleHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with(SENTINEL) {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.contains(char::is_whitespace) {
            return None;
        }
        self.candidates(line)
            .find(|cmd| cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for ConsoleHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();
        if !self.multiline.load(Ordering::Relaxed) || input.starts_with(SENTINEL) {
            return Ok(ValidationResult::Valid(None));
        }
        if input.is_empty() || input.ends_with('\n') {
            Ok(ValidationResult::Valid(None))
        } else {
            Ok(ValidationResult::Incomplete)
        }
    }
}

/// Reverses the entity escaping applied to output lines.
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x2F;", "/")
        .replace("&amp;", "&")
}

fn paint(category: Category, text: &str) -> ColoredString {
    match category {
        Category::Echo => format!("> {}", text).green(),
        Category::Response => text.bright_blue(),
        Category::Log => text.normal(),
        Category::Info => text.bright_black(),
        Category::Warn => text.yellow(),
        Category::Error => text.red(),
    }
}

/// Renders one output line for the terminal, repeat counter included.
pub fn render_line(line: &OutputLine) -> String {
    let text = unescape_html(&line.content);
    let painted = paint(line.category, &text).to_string();
    match line.count {
        Some(count) => format!("{} {}", painted, format!("({})", count).bright_magenta()),
        None => painted,
    }
}

/// Prints the part of the output log the terminal has not shown yet.
///
/// Tracks how many lines were printed and the repeat counter of the newest
/// one, so a bumped `log` counter is printed again.
#[derive(Debug, Default)]
pub struct OutputCursor {
    printed: usize,
    last_count: Option<u32>,
}

impl OutputCursor {
    /// Returns the rendered lines that are new since the previous call.
    pub fn advance(&mut self, lines: &[OutputLine]) -> Vec<String> {
        if lines.len() < self.printed {
            // Log was cleared.
            self.printed = 0;
            self.last_count = None;
        }

        let mut rendered = Vec::new();
        if self.printed > 0 && self.printed == lines.len() {
            let newest = &lines[self.printed - 1];
            if newest.count != self.last_count {
                rendered.push(render_line(newest));
            }
        }
        rendered.extend(lines[self.printed..].iter().map(render_line));

        self.printed = lines.len();
        self.last_count = lines.last().and_then(|line| line.count);
        rendered
    }
}
