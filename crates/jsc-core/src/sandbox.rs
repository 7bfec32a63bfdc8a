//! Collaborators the console talks to: the evaluation sandbox, the bridge
//! handed to it, and the pretty-printer applied to responses.

use tokio::sync::mpsc;

use crate::error::Result;
use crate::value::Value;

/// A call made by sandboxed code through the console bridge.
#[derive(Debug, Clone)]
pub enum BridgeCall {
    Log(Value),
    Info(Value),
    Warn(Value),
    Error(Value),
}

/// Capability object exposing exactly `log`, `info`, `warn` and `error` to
/// sandboxed code. Calls are queued and drained by the session.
#[derive(Debug, Clone)]
pub struct ConsoleBridge {
    sender: mpsc::UnboundedSender<BridgeCall>,
}

impl ConsoleBridge {
    /// Creates a bridge and the receiving end the session drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BridgeCall>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn log(&self, value: impl Into<Value>) {
        self.send(BridgeCall::Log(value.into()));
    }

    pub fn info(&self, value: impl Into<Value>) {
        self.send(BridgeCall::Info(value.into()));
    }

    pub fn warn(&self, value: impl Into<Value>) {
        self.send(BridgeCall::Warn(value.into()));
    }

    pub fn error(&self, value: impl Into<Value>) {
        self.send(BridgeCall::Error(value.into()));
    }

    fn send(&self, call: BridgeCall) {
        // The session may already be gone; the call is dropped then.
        let _ = self.sender.send(call);
    }
}

/// An isolated evaluation environment.
pub trait Sandbox {
    /// Evaluates `code` and returns its value, or the error it raised as
    /// [`ConsoleError::Evaluation`](crate::ConsoleError::Evaluation).
    fn evaluate(&mut self, code: &str) -> Result<Value>;

    /// Runs a loaded script for its side effects.
    fn inject(&mut self, source: &str) -> Result<()>;
}

/// Builds fresh sandboxes. Called once at startup and again on `:reset`.
pub trait SandboxFactory {
    fn create(&self, bridge: ConsoleBridge) -> Box<dyn Sandbox>;
}

impl<F> SandboxFactory for F
where
    F: Fn(ConsoleBridge) -> Box<dyn Sandbox>,
{
    fn create(&self, bridge: ConsoleBridge) -> Box<dyn Sandbox> {
        self(bridge)
    }
}

/// Syntax highlighter applied to formatted responses.
pub trait PrettyPrinter {
    fn pretty_print(&self, text: &str) -> String;
}

/// Identity printer, used when no highlighter is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainPrinter;

impl PrettyPrinter for PlainPrinter {
    fn pretty_print(&self, text: &str) -> String {
        text.to_string()
    }
}
