//! The bounded prompt-history window.

use gymcoach_core::message::{Message, Role};

/// Bounds on how much prior conversation is sent with each model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub max_messages: usize,
    pub max_chars: usize,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self {
            max_messages: 12,
            max_chars: 12_000,
        }
    }
}

impl HistoryWindow {
    pub fn new(max_messages: usize, max_chars: usize) -> Self {
        Self { max_messages, max_chars }
    }

    /// The newest non-system messages that fit both bounds.
    ///
    /// The most recent user message is always kept, even when it alone
    /// exceeds the bounds. Tool results whose originating assistant message
    /// fell out of the window are dropped from the front.
    pub fn select(&self, history: &[Message]) -> Vec<Message> {
        let conversation: Vec<&Message> = history.iter().filter(|m| m.role != Role::System).collect();
        let latest_user = conversation.iter().rposition(|m| m.role == Role::User);

        let mut start = conversation.len();
        let mut chars = 0usize;
        while start > 0 {
            let next = conversation[start - 1];
            let kept = conversation.len() - start;
            if kept >= self.max_messages || chars + next.char_len() > self.max_chars {
                break;
            }
            chars += next.char_len();
            start -= 1;
        }

        let mut window: Vec<Message> = Vec::with_capacity(conversation.len() - start + 1);
        if let Some(idx) = latest_user.filter(|idx| *idx < start) {
            window.push(conversation[idx].clone());
        }
        window.extend(
            conversation[start..]
                .iter()
                .skip_while(|m| m.role == Role::Tool)
                .map(|m| (*m).clone()),
        );
        window
    }
}

/// Only the most recent user message, used after a context overflow.
pub fn collapse_to_latest_user(history: &[Message]) -> Vec<Message> {
    history
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .cloned()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gymcoach_core::message::MessageToolCall;

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn keeps_newest_within_message_cap() {
        let history = vec![
            Message::system("sys"),
            Message::user("one"),
            Message::assistant("two"),
            Message::user("three"),
            Message::assistant("four"),
            Message::user("five"),
        ];
        let window = HistoryWindow::new(3, 1_000).select(&history);
        assert_eq!(contents(&window), vec!["three", "four", "five"]);
    }

    #[test]
    fn char_budget_trims_oldest_first() {
        let history = vec![
            Message::user("a".repeat(50)),
            Message::assistant("b".repeat(50)),
            Message::user("latest"),
        ];
        let window = HistoryWindow::new(10, 60).select(&history);
        assert_eq!(window.len(), 2);
        assert_eq!(window[1].content, "latest");
    }

    #[test]
    fn latest_user_survives_an_oversized_budget() {
        let history = vec![Message::assistant("hi"), Message::user("x".repeat(500))];
        let window = HistoryWindow::new(10, 100).select(&history);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].role, Role::User);
    }

    #[test]
    fn orphaned_tool_results_are_dropped() {
        let call = MessageToolCall {
            id: "c1".into(),
            name: "get_notes".into(),
            arguments: "{}".into(),
        };
        let history = vec![
            Message::user("q"),
            Message::assistant_tool_calls("", vec![call]),
            Message::tool_result("c1", "{}"),
            Message::assistant("answer"),
            Message::user("next"),
        ];
        let window = HistoryWindow::new(3, 1_000).select(&history);
        assert_eq!(contents(&window), vec!["answer", "next"]);
    }

    #[test]
    fn collapse_keeps_only_latest_user() {
        let history = vec![Message::user("old"), Message::assistant("a"), Message::user("new")];
        assert_eq!(contents(&collapse_to_latest_user(&history)), vec!["new"]);
        assert!(collapse_to_latest_user(&[Message::assistant("x")]).is_empty());
    }
}
