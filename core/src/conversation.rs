use serde::{Deserialize, Serialize};

use crate::types::ConversationTurn;

/// Append-only log of user questions and assistant answers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one question and its answer
    pub fn push_exchange(&mut self, question: &str, answer: &str) {
        self.turns.push(ConversationTurn::user(question));
        self.turns.push(ConversationTurn::assistant(answer));
    }

    /// The most recent `n` turns, oldest first
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_takes_the_tail() {
        let mut log = Conversation::new();
        for i in 0..5 {
            log.push_exchange(&format!("q{}", i), &format!("a{}", i));
        }
        let recent = log.recent(6);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0], ConversationTurn::user("q2"));
        assert_eq!(recent[5], ConversationTurn::assistant("a4"));
    }

    #[test]
    fn test_recent_on_short_log() {
        let mut log = Conversation::new();
        assert!(log.recent(6).is_empty());
        log.push_exchange("only", "one");
        assert_eq!(log.recent(6).len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut log = Conversation::new();
        log.push_exchange("q", "a");
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_serializes_as_role_tagged_list() {
        let mut log = Conversation::new();
        log.push_exchange("When to sow?", "In March.");
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["turns"][0]["role"], "user");
        assert_eq!(json["turns"][1]["role"], "assistant");
        assert_eq!(json["turns"][1]["content"], "In March.");
    }
}
