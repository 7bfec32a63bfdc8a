pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod history;
pub mod input;
pub mod keybind;
pub mod loader;
pub mod output;
pub mod overlay;
pub mod sandbox;
pub mod session;
pub mod value;

// Re-export the types most hosts need
pub use config::ConsoleConfig;
pub use error::{ConsoleError, Result};
pub use format::{FunctionStyle, ValueFormatter};
pub use keybind::{Chord, Dispatch, KeyEvent, KeyResult, KeyRouter};
pub use output::{Category, OutputLine, OutputLog};
pub use overlay::Overlay;
pub use sandbox::{ConsoleBridge, PlainPrinter, PrettyPrinter, Sandbox, SandboxFactory};
pub use session::{ConsoleSession, RunOutcome};
pub use value::Value;
