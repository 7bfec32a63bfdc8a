//! Command history with recall cursor and draft slot.
//!
//! Navigating away from an unsaved input stashes it as a draft; walking
//! forward past the newest entry hands the draft back.

use serde::{Deserialize, Serialize};

/// A command as it was accepted, or a draft stashed before navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    text: String,
    multiline: bool,
}

impl Command {
    /// Builds a command from raw input. The text is trimmed; a command with
    /// no text is never multi-line.
    pub fn new(text: &str, multiline: bool) -> Self {
        let text = text.trim().to_string();
        let multiline = multiline && !text.is_empty();
        Self { text, multiline }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_multiline(&self) -> bool {
        self.multiline
    }
}

/// Append-only, consecutive-deduplicating command log.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<Command>,
    /// Recall position in `[0, entries.len()]`.
    cursor: usize,
    draft: Option<Command>,
    /// Oldest entries are dropped beyond this many.
    limit: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history that keeps at most `limit` entries.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::default()
        }
    }

    /// Appends a command unless it repeats the newest entry (same text and
    /// mode). Returns whether it was appended.
    pub fn push(&mut self, text: &str, multiline: bool) -> bool {
        let command = Command::new(text, multiline);
        if self.entries.last() == Some(&command) {
            tracing::trace!(text = %command.text, "Skipped duplicate history entry");
            return false;
        }

        self.entries.push(command);
        if let Some(limit) = self.limit {
            if self.entries.len() > limit {
                let overflow = self.entries.len() - limit;
                self.entries.drain(..overflow);
            }
        }
        self.draft = None;
        self.cursor = self.entries.len();
        true
    }

    /// Stashes the current input as the draft unless one is already pending.
    pub fn save_draft(&mut self, text: &str, multiline: bool) {
        if self.draft.is_none() {
            self.draft = Some(Command::new(text, multiline));
        }
    }

    /// Moves one entry newer. Past the newest entry the draft comes back.
    pub fn recall_next(&mut self, text: &str, multiline: bool) -> Option<Command> {
        self.save_draft(text, multiline);

        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }

        if self.cursor == self.entries.len() {
            self.draft.take()
        } else {
            self.entries.get(self.cursor).cloned()
        }
    }

    /// Moves one entry older, stopping at the oldest.
    pub fn recall_prev(&mut self, text: &str, multiline: bool) -> Option<Command> {
        self.save_draft(text, multiline);

        self.cursor = self.cursor.saturating_sub(1);
        self.entries.get(self.cursor).cloned()
    }

    /// Drops every entry.
    pub fn purge(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn draft(&self) -> Option<&Command> {
        self.draft.as_ref()
    }

    pub fn entries(&self) -> &[Command] {
        &self.entries
    }

    pub fn last(&self) -> Option<&Command> {
        self.entries.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(items: &[&str]) -> History {
        let mut history = History::new();
        for item in items {
            history.push(item, false);
        }
        history
    }

    #[test]
    fn test_command_trims_and_empty_is_single_line() {
        let cmd = Command::new("  1 + 1 \n", true);
        assert_eq!(cmd.text(), "1 + 1");
        assert!(cmd.is_multiline());

        let empty = Command::new("   ", true);
        assert_eq!(empty.text(), "");
        assert!(!empty.is_multiline());
    }

    #[test]
    fn test_consecutive_duplicate_is_not_appended() {
        let mut history = History::new();
        assert!(history.push("a", false));
        assert!(!history.push("a ", false));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_same_text_different_mode_is_appended() {
        let mut history = History::new();
        history.push("a", false);
        history.push("a", true);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_non_consecutive_duplicate_is_appended() {
        let history = history_of(&["a", "b", "a"]);
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 3);
    }

    #[test]
    fn test_recall_prev_walks_back_and_clamps() {
        let mut history = history_of(&["A", "B"]);

        assert_eq!(history.recall_prev("", false).unwrap().text(), "B");
        assert_eq!(history.recall_prev("", false).unwrap().text(), "A");
        assert_eq!(history.recall_prev("", false).unwrap().text(), "A");
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn test_recall_next_returns_draft_at_end() {
        let mut history = history_of(&["A", "B"]);

        history.recall_prev("unsent", false);
        history.recall_prev("ignored", false);
        assert_eq!(history.cursor(), 0);

        assert_eq!(history.recall_next("A", false).unwrap().text(), "B");
        let draft = history.recall_next("B", false).unwrap();
        assert_eq!(draft.text(), "unsent");
        assert!(history.draft().is_none());
    }

    #[test]
    fn test_first_draft_wins() {
        let mut history = History::new();
        history.save_draft("first", true);
        history.save_draft("second", false);

        let draft = history.draft().unwrap();
        assert_eq!(draft.text(), "first");
        assert!(draft.is_multiline());
    }

    #[test]
    fn test_recall_prev_on_empty_history() {
        let mut history = History::new();
        assert!(history.recall_prev("typing", false).is_none());
        assert_eq!(history.draft().unwrap().text(), "typing");
    }

    #[test]
    fn test_push_clears_draft_and_resets_cursor() {
        let mut history = history_of(&["A", "B"]);
        history.recall_prev("draft", false);

        history.push("C", false);
        assert!(history.draft().is_none());
        assert_eq!(history.cursor(), 3);
    }

    #[test]
    fn test_purge() {
        let mut history = history_of(&["A", "B"]);
        history.purge();
        assert!(history.is_empty());
        assert_eq!(history.cursor(), 0);
        assert!(history.recall_prev("", false).is_none());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::with_limit(2);
        history.push("a", false);
        history.push("b", false);
        history.push("c", false);

        let texts: Vec<&str> = history.entries().iter().map(Command::text).collect();
        assert_eq!(texts, vec!["b", "c"]);
        assert_eq!(history.cursor(), 2);
    }
}
