//! Output log of the console.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Category of an output line; drives how the host styles it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// The command as the user typed it.
    Echo,
    /// The formatted result of an evaluation.
    Response,
    Log,
    Info,
    Warn,
    Error,
}

impl Category {
    /// CSS class the host attaches to lines of this category (`jsc-echo`).
    pub fn class_name(&self) -> String {
        format!("jsc-{}", self)
    }
}

/// A single rendered line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub content: String,
    pub category: Category,
    /// Repeat counter for consecutive identical `log` lines; starts at 2.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

impl OutputLine {
    pub fn new(category: Category, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            category,
            count: None,
        }
    }
}

/// Lines in chronological order, newest last.
#[derive(Debug, Clone, Default)]
pub struct OutputLog {
    lines: Vec<OutputLine>,
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, category: Category, content: impl Into<String>) {
        self.lines.push(OutputLine::new(category, content));
    }

    /// Appends a `log` line, or bumps the repeat counter when the newest
    /// line is a `log` line with the same content.
    pub fn push_log(&mut self, content: impl Into<String>) {
        let content = content.into();
        match self.lines.last_mut() {
            Some(last) if last.category == Category::Log && last.content == content => {
                last.count = Some(last.count.map_or(2, |n| n.saturating_add(1)));
            }
            _ => self.lines.push(OutputLine::new(Category::Log, content)),
        }
    }

    /// Removes every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[OutputLine] {
        &self.lines
    }

    pub fn last(&self) -> Option<&OutputLine> {
        self.lines.last()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_counter_saturates() {
        let mut log = OutputLog::new();
        log.push_log("x");
        log.lines[0].count = Some(u32::MAX);
        log.push_log("x");
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().count, Some(u32::MAX));
    }

    #[test]
    fn test_category_names() {
        assert_eq!(Category::Response.to_string(), "response");
        assert_eq!(Category::Warn.class_name(), "jsc-warn");
        assert_eq!("error".parse::<Category>().unwrap(), Category::Error);
    }

    #[test]
    fn test_repeated_log_bumps_counter() {
        let mut log = OutputLog::new();
        log.push_log("&quot;x&quot;");
        log.push_log("&quot;x&quot;");
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().count, Some(2));

        log.push_log("&quot;x&quot;");
        assert_eq!(log.last().unwrap().count, Some(3));
    }

    #[test]
    fn test_log_dedup_only_against_newest_line() {
        let mut log = OutputLog::new();
        log.push_log("a");
        log.push(Category::Info, "between");
        log.push_log("a");
        assert_eq!(log.len(), 3);
        assert_eq!(log.last().unwrap().count, None);
    }

    #[test]
    fn test_non_log_lines_never_merge() {
        let mut log = OutputLog::new();
        log.push(Category::Info, "same");
        log.push(Category::Info, "same");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut log = OutputLog::new();
        log.push(Category::Echo, "1");
        log.clear();
        assert!(log.is_empty());
    }
}
