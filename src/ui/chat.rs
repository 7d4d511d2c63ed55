//! Chat pane contents
//!
//! Server chat, status and error messages end up here as labelled lines.

use std::collections::VecDeque;

/// Lines kept before the oldest is dropped
const CHAT_LIMIT: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Chat,
    Status,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatLine {
    pub kind: ChatKind,
    pub label: String,
    pub text: String,
}

pub struct ChatLog {
    lines: VecDeque<ChatLine>,
    limit: usize,
    dirty: bool,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatLog {
    pub fn new() -> Self {
        Self::with_limit(CHAT_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            limit: limit.max(1),
            dirty: false,
        }
    }

    fn push(&mut self, kind: ChatKind, label: String, text: &str) {
        if self.lines.len() == self.limit {
            self.lines.pop_front();
        }
        self.lines.push_back(ChatLine {
            kind,
            label,
            text: text.to_string(),
        });
        self.dirty = true;
    }

    pub fn add_chat(&mut self, sender: &str, text: &str) {
        self.push(ChatKind::Chat, format!("{} :", sender), text);
    }

    pub fn add_status(&mut self, text: &str) {
        self.push(ChatKind::Status, "*".to_string(), text);
    }

    pub fn add_error(&mut self, text: &str) {
        self.push(ChatKind::Error, "!".to_string(), text);
    }

    pub fn lines(&self) -> impl DoubleEndedIterator<Item = &ChatLine> + ExactSizeIterator {
        self.lines.iter()
    }

    /// Whether lines were added since the last call
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let mut log = ChatLog::new();
        log.add_chat("alice", "hi");
        log.add_status("bob joined");
        log.add_error("You are not the current arbiter.");

        let labels: Vec<_> = log.lines().map(|l| (l.kind, l.label.as_str())).collect();
        assert_eq!(
            labels,
            vec![
                (ChatKind::Chat, "alice :"),
                (ChatKind::Status, "*"),
                (ChatKind::Error, "!"),
            ]
        );
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut log = ChatLog::with_limit(2);
        log.add_status("one");
        log.add_status("two");
        log.add_status("three");
        let texts: Vec<_> = log.lines().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["two", "three"]);
    }

    #[test]
    fn test_dirty_flag() {
        let mut log = ChatLog::new();
        assert!(!log.take_dirty());
        log.add_status("x");
        assert!(log.take_dirty());
        assert!(!log.take_dirty());
    }
}
