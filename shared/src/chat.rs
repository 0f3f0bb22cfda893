use crate::api::ChatMessageResponse;
use crate::request::{RequestGate, Ticket};

pub const USER_PREFIX: &str = "You: ";
pub const ASSISTANT_PREFIX: &str = "🤖: ";

/// Error text for a failed chat call; `None` status means the request never
/// got an HTTP response.
pub fn chat_error_message(status: Option<u16>) -> String {
    match status {
        Some(code) => format!("Chat request failed ({code})"),
        None => "Chat request failed (network)".to_string(),
    }
}

/// In-memory chat transcript with a one-request-at-a-time send rule.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    lines: Vec<String>,
    note: Option<String>,
    error: Option<String>,
    gate: RequestGate,
}

impl ChatSession {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.gate.is_busy()
    }

    /// Start sending `input`. Blank input or a pending request is ignored.
    /// On success the user line is already in the transcript and the
    /// trimmed message is returned for the service call.
    pub fn begin_send(&mut self, input: &str) -> Option<(Ticket, String)> {
        let message = input.trim();
        if message.is_empty() || self.gate.is_busy() {
            return None;
        }
        let ticket = self.gate.begin()?;
        self.lines.push(format!("{USER_PREFIX}{message}"));
        self.error = None;
        Some((ticket, message.to_string()))
    }

    pub fn settle_reply(&mut self, ticket: Ticket, response: ChatMessageResponse) {
        if !self.gate.finish(ticket) {
            return;
        }
        self.lines
            .push(format!("{ASSISTANT_PREFIX}{}", response.reply));
        self.note = response.note;
    }

    pub fn settle_error(&mut self, ticket: Ticket, message: String) {
        if !self.gate.finish(ticket) {
            return;
        }
        self.error = Some(message);
    }

    pub fn cancel(&mut self) {
        self.gate.cancel();
    }
}

pub fn is_user_line(line: &str) -> bool {
    line.starts_with(USER_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(text: &str, note: Option<&str>) -> ChatMessageResponse {
        ChatMessageResponse {
            reply: text.to_string(),
            note: note.map(str::to_string),
        }
    }

    #[test]
    fn whitespace_input_is_ignored() {
        let mut session = ChatSession::default();
        assert!(session.begin_send("  ").is_none());
        assert!(session.begin_send("").is_none());
        assert!(session.lines().is_empty());
        assert!(!session.is_loading());
    }

    #[test]
    fn successful_exchange_appends_two_lines_in_order() {
        let mut session = ChatSession::default();
        let (ticket, message) = session.begin_send("hello").expect("send accepted");
        assert_eq!(message, "hello");
        assert_eq!(session.lines(), ["You: hello"]);
        session.settle_reply(ticket, reply("Ice is thin.", None));
        assert_eq!(session.lines(), ["You: hello", "🤖: Ice is thin."]);
        assert!(!session.is_loading());
    }

    #[test]
    fn send_while_pending_is_dropped() {
        let mut session = ChatSession::default();
        let (ticket, _) = session.begin_send("first").expect("send accepted");
        assert!(session.begin_send("second").is_none());
        session.settle_reply(ticket, reply("ok", None));
        assert_eq!(session.lines(), ["You: first", "🤖: ok"]);
    }

    #[test]
    fn note_is_replaced_per_exchange() {
        let mut session = ChatSession::default();
        let (t1, _) = session.begin_send("a").expect("send accepted");
        session.settle_reply(t1, reply("r1", Some("Missing GOOGLE_API_KEY")));
        assert_eq!(session.note(), Some("Missing GOOGLE_API_KEY"));
        let (t2, _) = session.begin_send("b").expect("send accepted");
        session.settle_reply(t2, reply("r2", None));
        assert_eq!(session.note(), None);
    }

    #[test]
    fn error_is_shown_and_cleared_on_next_send() {
        let mut session = ChatSession::default();
        let (t1, _) = session.begin_send("a").expect("send accepted");
        session.settle_error(t1, chat_error_message(Some(500)));
        assert_eq!(session.error(), Some("Chat request failed (500)"));
        assert_eq!(session.lines(), ["You: a"]);
        assert!(session.begin_send(" b ").is_some());
        assert_eq!(session.error(), None);
        assert_eq!(session.lines().last().map(String::as_str), Some("You: b"));
    }

    #[test]
    fn response_after_cancel_is_discarded() {
        let mut session = ChatSession::default();
        let (ticket, _) = session.begin_send("a").expect("send accepted");
        session.cancel();
        session.settle_reply(ticket, reply("late", Some("late note")));
        assert_eq!(session.lines(), ["You: a"]);
        assert_eq!(session.note(), None);
    }

    #[test]
    fn network_error_message() {
        assert_eq!(chat_error_message(None), "Chat request failed (network)");
        assert!(is_user_line("You: x"));
        assert!(!is_user_line("🤖: x"));
    }
}
