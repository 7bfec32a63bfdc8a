//! The console session.
//!
//! Owns the output log, the history, the input surface and the sandbox, and
//! implements everything the key bindings trigger: running input, recalling
//! history and the display toggles.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::commands::{self, Invocation, SystemCommand};
use crate::config::ConsoleConfig;
use crate::error::ConsoleError;
use crate::format::{ValueFormatter, escape_html};
use crate::history::{Command, History};
use crate::input::{EditorState, InputMode, ModeController};
use crate::loader::{self, HttpScriptLoader, LoadOutcome, ScriptLoader};
use crate::output::{Category, OutputLog};
use crate::sandbox::{
    BridgeCall, ConsoleBridge, PlainPrinter, PrettyPrinter, Sandbox, SandboxFactory,
};
use crate::value::Value;

/// What [`ConsoleSession::run`] did with an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing but whitespace; ignored.
    Empty,
    /// Evaluated successfully; recorded in history.
    Evaluated,
    /// Evaluation raised an error; not recorded.
    Failed,
    /// A system command ran; recorded in history.
    System(SystemCommand),
    /// `:` followed by an unknown name; not recorded.
    InvalidCommand,
}

impl RunOutcome {
    /// True when the input was accepted and pushed to history.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Evaluated | Self::System(_))
    }
}

/// An interactive console bound to one sandbox.
pub struct ConsoleSession {
    output: OutputLog,
    history: History,
    modes: ModeController,
    editor: EditorState,

    hidden: bool,
    focused: bool,
    transparent: bool,

    factory: Box<dyn SandboxFactory>,
    sandbox: Box<dyn Sandbox>,
    bridge: ConsoleBridge,
    bridge_calls: mpsc::UnboundedReceiver<BridgeCall>,

    formatter: ValueFormatter,
    printer: Box<dyn PrettyPrinter>,

    libraries: HashMap<String, String>,
    loader: Arc<dyn ScriptLoader>,
    load_sender: mpsc::UnboundedSender<LoadOutcome>,
    load_results: mpsc::UnboundedReceiver<LoadOutcome>,
    pending_loads: usize,
}

impl ConsoleSession {
    /// Creates a hidden session with a fresh sandbox from `factory`.
    pub fn new(factory: impl SandboxFactory + 'static, config: &ConsoleConfig) -> Self {
        let (bridge, bridge_calls) = ConsoleBridge::channel();
        let sandbox = factory.create(bridge.clone());
        let (load_sender, load_results) = mpsc::unbounded_channel();

        let history = match config.history_limit {
            Some(limit) => History::with_limit(limit),
            None => History::new(),
        };
        let mode = InputMode::from_multiline(config.start_multiline);

        Self {
            output: OutputLog::new(),
            history,
            modes: ModeController::new(mode),
            editor: EditorState::default(),
            hidden: true,
            focused: false,
            transparent: false,
            factory: Box::new(factory),
            sandbox,
            bridge,
            bridge_calls,
            formatter: ValueFormatter::new(config.function_style),
            printer: Box::new(PlainPrinter),
            libraries: config.libraries.clone(),
            loader: Arc::new(HttpScriptLoader::new()),
            load_sender,
            load_results,
            pending_loads: 0,
        }
    }

    /// Replaces the pretty-printer applied to responses.
    pub fn with_printer(mut self, printer: impl PrettyPrinter + 'static) -> Self {
        self.printer = Box::new(printer);
        self
    }

    /// Replaces the loader used by `:load`.
    pub fn with_loader(mut self, loader: Arc<dyn ScriptLoader>) -> Self {
        self.loader = loader;
        self
    }

    // ============================================================================
    // Running input
    // ============================================================================

    /// Runs the current input and clears it when accepted.
    pub fn run_input(&mut self) -> RunOutcome {
        let text = self.editor.text().to_string();
        self.run(&text)
    }

    /// Runs one command line.
    ///
    /// `:`-prefixed input is a system command; anything else is echoed and
    /// evaluated in the sandbox. Accepted input is pushed to history with
    /// the current mode and the input surface is cleared.
    pub fn run(&mut self, raw: &str) -> RunOutcome {
        let cmd = raw.trim();
        if cmd.is_empty() {
            return RunOutcome::Empty;
        }

        let outcome = if commands::is_system_command(cmd) {
            match Invocation::parse(cmd) {
                Ok(invocation) => {
                    self.execute(&invocation);
                    RunOutcome::System(invocation.command)
                }
                Err(e) => {
                    tracing::debug!(input = cmd, "Unknown system command");
                    self.error(e.to_string());
                    RunOutcome::InvalidCommand
                }
            }
        } else {
            self.echo(&escape_html(cmd));
            let result = self.sandbox.evaluate(cmd);
            self.drain_bridge();
            match result {
                Ok(value) => {
                    self.response(&value);
                    RunOutcome::Evaluated
                }
                Err(e) => {
                    tracing::debug!(input = cmd, error = %e, "Evaluation failed");
                    self.error(escape_html(&e.to_string()));
                    RunOutcome::Failed
                }
            }
        };

        if outcome.is_accepted() {
            self.history.push(cmd, self.modes.is_multiline());
            self.editor = EditorState::default();
        }
        outcome
    }

    fn execute(&mut self, invocation: &Invocation) {
        tracing::debug!(command = %invocation.command, "Running system command");
        match invocation.command {
            SystemCommand::Clear => self.output.clear(),
            SystemCommand::Reset => {
                self.echo(&escape_html(&invocation.echo_text()));
                self.reset_sandbox();
                self.info("Variables reset.");
            }
            SystemCommand::Purge => {
                self.echo(&escape_html(&invocation.echo_text()));
                self.history.purge();
                tracing::info!("History purged");
                self.info("History cleared.");
            }
            SystemCommand::Load => {
                self.echo(&escape_html(&invocation.echo_text()));
                for target in invocation.args() {
                    let url = commands::resolve_load_target(target, &self.libraries);
                    self.start_load(url);
                }
            }
            SystemCommand::Help => {
                self.echo(&escape_html(&invocation.echo_text()));
                self.info(commands::help_text());
            }
        }
    }

    /// Drops the current sandbox and all its state, and builds a new one.
    pub fn reset_sandbox(&mut self) {
        self.drain_bridge();
        let (bridge, bridge_calls) = ConsoleBridge::channel();
        self.sandbox = self.factory.create(bridge.clone());
        self.bridge = bridge;
        self.bridge_calls = bridge_calls;
        tracing::info!("Sandbox reset");
    }

    // ============================================================================
    // Output
    // ============================================================================

    /// Posts an `echo` line. `content` must already be HTML-safe.
    pub fn echo(&mut self, content: &str) {
        self.output.push(Category::Echo, content);
    }

    /// Posts the formatted, pretty-printed `value` as a `response` line.
    pub fn response(&mut self, value: &Value) {
        let display = self.formatter.format(value);
        let display = self.printer.pretty_print(&display);
        self.output.push(Category::Response, display);
    }

    /// Posts a formatted value as a `log` line, merging consecutive repeats.
    pub fn log(&mut self, value: &Value) {
        let text = self.formatter.format(value);
        self.output.push_log(text);
    }

    /// Posts an `info` line. `content` must already be HTML-safe.
    pub fn info(&mut self, content: impl Into<String>) {
        self.output.push(Category::Info, content);
    }

    /// Posts a `warn` line. `content` must already be HTML-safe.
    pub fn warn(&mut self, content: impl Into<String>) {
        self.output.push(Category::Warn, content);
    }

    /// Posts an `error` line. `content` must already be HTML-safe.
    pub fn error(&mut self, content: impl Into<String>) {
        self.output.push(Category::Error, content);
    }

    /// Applies everything sandboxed code sent through the bridge.
    fn drain_bridge(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(call) = self.bridge_calls.try_recv() {
            match call {
                BridgeCall::Log(value) => self.log(&value),
                BridgeCall::Info(value) => self.info(escape_html(&value.to_string())),
                BridgeCall::Warn(value) => self.warn(escape_html(&value.to_string())),
                BridgeCall::Error(value) => self.error(escape_html(&value.to_string())),
            }
            applied += 1;
        }
        applied
    }

    // ============================================================================
    // Script loading
    // ============================================================================

    fn start_load(&mut self, url: String) {
        tracing::info!(url = %url, "Loading script");
        match loader::spawn_load(self.loader.clone(), url.clone(), self.load_sender.clone()) {
            Ok(()) => self.pending_loads += 1,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Could not start script load");
                self.load_failed(&url);
            }
        }
    }

    fn apply_load(&mut self, outcome: LoadOutcome) {
        self.pending_loads = self.pending_loads.saturating_sub(1);
        let injected = outcome
            .result
            .and_then(|source| self.sandbox.inject(&source));
        self.drain_bridge();

        match injected {
            Ok(()) => self.info(escape_html(&format!(
                "Loaded script from `{}`",
                outcome.url
            ))),
            Err(e) => {
                tracing::warn!(url = %outcome.url, error = %e, "Script not loaded");
                self.load_failed(&outcome.url);
            }
        }
    }

    fn load_failed(&mut self, url: &str) {
        self.error(escape_html(&format!("Failed to load script from `{}`", url)));
    }

    /// Number of `:load` fetches still in flight.
    pub fn pending_loads(&self) -> usize {
        self.pending_loads
    }

    /// Waits for the next load to finish and applies it. Returns false when
    /// no load is pending.
    pub async fn next_load(&mut self) -> bool {
        if self.pending_loads == 0 {
            return false;
        }
        match self.load_results.recv().await {
            Some(outcome) => {
                self.apply_load(outcome);
                true
            }
            None => false,
        }
    }

    /// Applies finished loads and queued bridge calls without waiting.
    /// Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = self.drain_bridge();
        while let Ok(outcome) = self.load_results.try_recv() {
            self.apply_load(outcome);
            applied += 1;
        }
        applied
    }

    // ============================================================================
    // History and modes
    // ============================================================================

    /// Replaces the input with the previous history entry.
    pub fn recall_prev(&mut self) {
        let recalled = self
            .history
            .recall_prev(self.editor.text(), self.modes.is_multiline());
        if let Some(command) = recalled {
            self.apply_recalled(command);
        }
    }

    /// Replaces the input with the next history entry, or the stashed draft.
    pub fn recall_next(&mut self) {
        let recalled = self
            .history
            .recall_next(self.editor.text(), self.modes.is_multiline());
        if let Some(command) = recalled {
            self.apply_recalled(command);
        }
    }

    fn apply_recalled(&mut self, command: Command) {
        self.editor = EditorState::new(command.text());
        self.toggle_mode(Some(InputMode::from_multiline(command.is_multiline())));
    }

    /// Switches the input mode (flips when `target` is `None`).
    ///
    /// A refused switch is reported as an `info` line. Returns whether the
    /// switch happened.
    pub fn toggle_mode(&mut self, target: Option<InputMode>) -> bool {
        match self.modes.toggle(target, self.editor.text()) {
            Ok(_) => true,
            Err(e @ ConsoleError::ModeSwitch) => {
                self.info(e.to_string());
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unexpected mode switch failure");
                false
            }
        }
    }

    /// Toggles resizing of the multi-line input. No-op in single-line mode.
    pub fn toggle_resizable(&mut self) -> bool {
        self.modes.toggle_resizable()
    }

    // ============================================================================
    // Display
    // ============================================================================

    /// Shows or hides the console. Showing focuses the input, hiding blurs it.
    pub fn toggle_display(&mut self) {
        if self.hidden {
            self.show();
        } else {
            self.hidden = true;
            self.focused = false;
        }
    }

    /// Makes the console visible and focuses the input.
    pub fn show(&mut self) {
        self.hidden = false;
        self.focused = true;
    }

    /// Toggles translucency. Only allowed while visible; returns whether it
    /// acted.
    pub fn toggle_transparency(&mut self) -> bool {
        if self.hidden {
            return false;
        }
        self.transparent = !self.transparent;
        true
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused && !self.hidden;
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    pub fn output(&self) -> &OutputLog {
        &self.output
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn mode(&self) -> InputMode {
        self.modes.mode()
    }

    pub fn is_multiline(&self) -> bool {
        self.modes.is_multiline()
    }

    pub fn is_resizable(&self) -> bool {
        self.modes.is_resizable()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    pub fn editor(&self) -> &EditorState {
        &self.editor
    }

    pub fn input(&self) -> &str {
        self.editor.text()
    }

    /// Replaces the input surface contents and selection.
    pub fn set_editor(&mut self, editor: EditorState) {
        self.editor = editor;
    }

    /// Replaces the input text, caret at the end.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.editor = EditorState::new(text);
    }

    /// Bridge into the current sandbox, for hosts that log from outside.
    pub fn bridge(&self) -> &ConsoleBridge {
        &self.bridge
    }
}

impl std::fmt::Debug for ConsoleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("mode", &self.modes.mode())
            .field("hidden", &self.hidden)
            .field("focused", &self.focused)
            .field("output_lines", &self.output.len())
            .field("history_len", &self.history.len())
            .field("pending_loads", &self.pending_loads)
            .finish()
    }
}
