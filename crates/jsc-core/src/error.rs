//! Error types for the JSC console core.

use thiserror::Error;

/// A shared error type for the console core.
///
/// Nothing here is fatal to a session: every variant ends up rendered as a
/// line in the output log and the console stays interactive.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsoleError {
    /// Code evaluated in the sandbox raised an error
    #[error("{0}")]
    Evaluation(String),

    /// A `:`-prefixed input did not name a known system command
    #[error("Invalid command.")]
    InvalidCommand(String),

    /// A mode switch was refused because it would lose input structure
    #[error("Cannot switch to single-line mode while editing multi-line code.")]
    ModeSwitch,

    /// A key chord string could not be parsed
    #[error("Invalid key chord: '{0}'")]
    InvalidChord(String),

    /// Fetching or injecting a script failed
    #[error("Failed to load script from `{url}`: {message}")]
    Load { url: String, message: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConsoleError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an Evaluation error
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation(message.into())
    }

    /// Creates a Load error
    pub fn load(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this error was raised by evaluated code
    pub fn is_evaluation(&self) -> bool {
        matches!(self, Self::Evaluation(_))
    }

    /// Check if this error comes from user input (bad command, refused switch)
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidCommand(_) | Self::ModeSwitch | Self::InvalidChord(_)
        )
    }

    /// Check if this is a script load error
    pub fn is_load(&self) -> bool {
        matches!(self, Self::Load { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ConsoleError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<toml::de::Error> for ConsoleError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Self::Load {
            url,
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ConsoleError>`.
pub type Result<T> = std::result::Result<T, ConsoleError>;
