//! Conversation state: the append-only list of exchanged messages.

use fuentes_stream::Answer;
use serde::{Deserialize, Serialize};

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// A query as the user submitted it (trimmed)
    User { content: String, timestamp: i64 },
    /// A finished answer, or the error shown in place of one
    Assistant {
        content: String,
        #[serde(default)]
        sources: Vec<String>,
        #[serde(default)]
        error: bool,
        timestamp: i64,
    },
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
            timestamp: now_millis(),
        }
    }

    /// Create an assistant message from a split answer
    pub fn assistant(answer: Answer) -> Self {
        Message::Assistant {
            content: answer.content,
            sources: answer.sources,
            error: false,
            timestamp: now_millis(),
        }
    }

    /// Create an assistant error message
    pub fn error(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: content.into(),
            sources: Vec::new(),
            error: true,
            timestamp: now_millis(),
        }
    }

    /// Message text
    pub fn content(&self) -> &str {
        match self {
            Message::User { content, .. } | Message::Assistant { content, .. } => content,
        }
    }

    /// Cited sources (always empty for user messages)
    pub fn sources(&self) -> &[String] {
        match self {
            Message::User { .. } => &[],
            Message::Assistant { sources, .. } => sources,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Message::User { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Message::Assistant { error: true, .. })
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Message::User { timestamp, .. } | Message::Assistant { timestamp, .. } => *timestamp,
        }
    }
}

/// Ordered, append-only message history.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Messages are never edited or removed.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_from_answer() {
        let msg = Message::assistant(Answer {
            content: "Respuesta".into(),
            sources: vec!["Fuente [1] a".into()],
        });
        assert_eq!(msg.content(), "Respuesta");
        assert_eq!(msg.sources(), ["Fuente [1] a".to_string()]);
        assert!(!msg.is_error());
        assert!(!msg.is_user());
    }

    #[test]
    fn test_error_message_has_no_sources() {
        let msg = Message::error("Error al procesar la consulta");
        assert!(msg.is_error());
        assert!(msg.sources().is_empty());
    }

    #[test]
    fn test_message_serializes_with_role_tag() {
        let msg = Message::User {
            content: "hola".into(),
            timestamp: 1,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hola");

        let parsed: Message =
            serde_json::from_str(r#"{"role":"assistant","content":"x","timestamp":2}"#).unwrap();
        assert!(!parsed.is_error());
        assert!(parsed.sources().is_empty());
    }

    #[test]
    fn test_conversation_appends_in_order() {
        let mut conv = Conversation::new();
        assert!(conv.is_empty());
        conv.push(Message::user("q"));
        conv.push(Message::error("e"));
        assert_eq!(conv.len(), 2);
        assert!(conv.messages()[0].is_user());
        assert!(conv.last().is_some_and(Message::is_error));
    }
}
