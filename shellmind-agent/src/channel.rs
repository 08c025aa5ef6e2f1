//! Queue between the interaction loop and whatever displays its results.

use std::fmt;
use tracing::debug;

/// What a display message reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Free-text reply from the model
    Response,
    /// Output of an executed command
    CommandOutput,
    /// A recovered failure (bad payload, provider error, rejected command, ...)
    Error,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Response => "response",
            MessageKind::CommandOutput => "command_output",
            MessageKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl DisplayMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn response(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Response, text)
    }

    pub fn command_output(text: impl Into<String>) -> Self {
        Self::new(MessageKind::CommandOutput, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, text)
    }
}

impl fmt::Display for DisplayMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.text)
    }
}

/// Ordered outbox of display messages
#[derive(Debug, Default)]
pub struct MessageChannel {
    messages: Vec<DisplayMessage>,
}

impl MessageChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_message(&mut self, message: DisplayMessage) {
        debug!(kind = message.kind.as_str(), len = message.text.len(), "message sent");
        self.messages.push(message);
    }

    /// Take every pending message, oldest first
    pub fn receive_messages(&mut self) -> Vec<DisplayMessage> {
        std::mem::take(&mut self.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_drains_in_order() {
        let mut channel = MessageChannel::new();
        channel.send_message(DisplayMessage::response("hello"));
        channel.send_message(DisplayMessage::error("Error: boom"));

        let received = channel.receive_messages();
        assert_eq!(
            received,
            vec![DisplayMessage::response("hello"), DisplayMessage::error("Error: boom")]
        );
        assert!(channel.receive_messages().is_empty());
    }

    #[test]
    fn test_display_includes_kind() {
        let msg = DisplayMessage::command_output("hi\n");
        assert_eq!(msg.to_string(), "[command_output] hi\n");
    }
}
