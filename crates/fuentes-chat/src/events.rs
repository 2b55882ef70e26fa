//! Chat event types

use serde::{Deserialize, Serialize};

use crate::{conversation::Message, session::SessionId};

/// Orchestration state of a query session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    Idle,
    Submitting,
    Streaming,
    Finalizing,
    Errored,
}

impl QueryState {
    /// Whether a request is in flight and the UI should show progress
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Submitting | QueryState::Streaming)
    }
}

/// Events emitted while a query runs. Every event names its session so
/// subscribers can drop events from a superseded one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A submission was accepted
    SessionStart {
        session_id: SessionId,
        query: String,
        collections: Vec<String>,
    },

    /// The session moved to a new state
    StateChanged {
        session_id: SessionId,
        state: QueryState,
    },

    /// The live answer text changed
    Update { session_id: SessionId, text: String },

    /// A message was appended to the conversation
    MessageAppended {
        session_id: SessionId,
        message: Message,
    },

    /// The session failed; `message` is the underlying cause
    Error {
        session_id: SessionId,
        message: String,
    },

    /// The session is over and the chat is idle again
    SessionEnd { session_id: SessionId },
}

impl ChatEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            ChatEvent::SessionStart { session_id, .. }
            | ChatEvent::StateChanged { session_id, .. }
            | ChatEvent::Update { session_id, .. }
            | ChatEvent::MessageAppended { session_id, .. }
            | ChatEvent::Error { session_id, .. }
            | ChatEvent::SessionEnd { session_id } => *session_id,
        }
    }

    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::SessionEnd { .. })
    }
}
