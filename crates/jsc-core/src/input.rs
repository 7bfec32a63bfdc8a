//! Input editing: single/multi-line mode and indentation edits.
//!
//! Edits are pure functions from one [`EditorState`] to the next; the
//! overlay applies the result in a single step. Offsets are byte offsets on
//! `char` boundaries.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, Result};

static RE_NEWLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r\n|\r|\n").expect("static regex is valid"));

/// Returns true if `text` contains a line break (`\r\n`, `\r` or `\n`).
pub fn has_line_break(text: &str) -> bool {
    RE_NEWLINE.is_match(text)
}

// ============================================================================
// Mode
// ============================================================================

/// Editing mode of the input surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    #[default]
    SingleLine,
    MultiLine,
}

impl InputMode {
    pub fn flipped(self) -> Self {
        match self {
            Self::SingleLine => Self::MultiLine,
            Self::MultiLine => Self::SingleLine,
        }
    }

    pub fn is_multiline(self) -> bool {
        self == Self::MultiLine
    }

    pub fn from_multiline(multiline: bool) -> Self {
        if multiline { Self::MultiLine } else { Self::SingleLine }
    }
}

/// Tracks the editing mode and the multi-line resize flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeController {
    mode: InputMode,
    resizable: bool,
}

impl ModeController {
    pub fn new(mode: InputMode) -> Self {
        Self {
            mode,
            resizable: false,
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn is_multiline(&self) -> bool {
        self.mode.is_multiline()
    }

    pub fn is_resizable(&self) -> bool {
        self.resizable
    }

    /// Switches to `target`, or flips the mode when no target is given.
    ///
    /// Leaving multi-line mode while `text` spans several lines is refused
    /// with [`ConsoleError::ModeSwitch`] and the mode is left unchanged.
    pub fn toggle(&mut self, target: Option<InputMode>, text: &str) -> Result<InputMode> {
        let target = target.unwrap_or_else(|| self.mode.flipped());

        if self.mode == InputMode::MultiLine
            && target == InputMode::SingleLine
            && has_line_break(text)
        {
            return Err(ConsoleError::ModeSwitch);
        }

        if target == InputMode::SingleLine {
            self.resizable = false;
        }
        if self.mode != target {
            tracing::debug!(from = ?self.mode, to = ?target, "Input mode changed");
        }
        self.mode = target;
        Ok(target)
    }

    /// Flips the resize flag. Only acts in multi-line mode.
    pub fn toggle_resizable(&mut self) -> bool {
        if self.is_multiline() {
            self.resizable = !self.resizable;
        }
        self.resizable
    }
}

// ============================================================================
// Editor state and pure edits
// ============================================================================

/// Text of the input surface plus the current selection.
///
/// The selection is always ordered, within the text and on `char`
/// boundaries; the constructors enforce it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
    text: String,
    /// Selected span; empty when it is just a caret.
    selection: Range<usize>,
}

impl EditorState {
    /// State with the caret at the end of `text`.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let end = text.len();
        Self {
            text,
            selection: end..end,
        }
    }

    /// State with an explicit selection, clamped to the text and snapped to
    /// `char` boundaries.
    pub fn with_selection(text: impl Into<String>, selection: Range<usize>) -> Self {
        let text = text.into();
        let start = floor_char_boundary(&text, selection.start.min(selection.end));
        let end = floor_char_boundary(&text, selection.end.max(selection.start));
        Self {
            text,
            selection: start..end,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    pub fn caret(&self) -> usize {
        self.selection.end
    }

    pub fn has_selection(&self) -> bool {
        self.selection.start != self.selection.end
    }

    pub fn selected(&self) -> &str {
        &self.text[self.selection.clone()]
    }
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Replaces the selection with `inserted`, leaving the caret after it.
pub fn insert_text(state: &EditorState, inserted: &str) -> EditorState {
    let (start, end) = (state.selection.start, state.selection.end);
    let mut text = String::with_capacity(state.text.len() + inserted.len());
    text.push_str(&state.text[..start]);
    text.push_str(inserted);
    text.push_str(&state.text[end..]);

    let caret = start + inserted.len();
    EditorState {
        text,
        selection: caret..caret,
    }
}

/// Tab handling in multi-line mode.
///
/// With a bare caret a tab is inserted. With a selection every selected line
/// gets one tab prepended, or (with `outdent`) loses one leading tab; the
/// selection then covers the rewritten span.
pub fn indent(state: &EditorState, outdent: bool) -> EditorState {
    if !state.has_selection() {
        return insert_text(state, "\t");
    }

    let indented = RE_NEWLINE
        .split(state.selected())
        .map(|line| {
            if outdent {
                line.strip_prefix('\t').unwrap_or(line).to_string()
            } else {
                format!("\t{}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let start = state.selection.start;
    let replaced = insert_text(state, &indented);
    EditorState {
        text: replaced.text,
        selection: start..start + indented.len(),
    }
}

/// Leading tabs and spaces of the line that ends at `caret`.
///
/// Meant to be called right after a line break was inserted: the break just
/// before `caret` is skipped and the line preceding it is inspected.
pub fn previous_line_indent(text: &str, caret: usize) -> &str {
    let before = &text[..floor_char_boundary(text, caret)];
    let before = before
        .strip_suffix("\r\n")
        .or_else(|| before.strip_suffix('\n'))
        .or_else(|| before.strip_suffix('\r'))
        .unwrap_or(before);

    let line_start = before.rfind(['\n', '\r']).map(|i| i + 1).unwrap_or(0);
    let line = &before[line_start..];
    let indent_len = line.len() - line.trim_start_matches(['\t', ' ']).len();
    &line[..indent_len]
}

/// Enter auto-indent: replays the previous line's indentation as tab and
/// space key presses at the caret.
pub fn auto_indent(state: &EditorState) -> EditorState {
    let indentation = previous_line_indent(&state.text, state.caret()).to_string();

    let mut next = state.clone();
    for c in indentation.chars() {
        next = match c {
            '\t' => indent(&next, false),
            _ => insert_text(&next, " "),
        };
    }
    next
}
