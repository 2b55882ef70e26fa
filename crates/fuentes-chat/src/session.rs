//! Per-query stream session state

use std::fmt;

use fuentes_stream::{StreamAccumulator, StreamEvent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier carried by every event of one query session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Mutable state of one submission. Dropped when the submission ends.
#[derive(Debug, Default)]
pub struct StreamSession {
    id: SessionId,
    accumulator: StreamAccumulator,
}

impl StreamSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Apply one event, returning the live text to publish
    pub fn apply(&mut self, event: &StreamEvent) -> &str {
        self.accumulator.apply(event)
    }

    pub fn live_text(&self) -> &str {
        self.accumulator.live_text()
    }

    /// Whether the backend sent its authoritative final text
    pub fn received_final(&self) -> bool {
        self.accumulator.is_final()
    }

    /// The session result: the final text, or all deltas if none arrived
    pub fn into_text(self) -> String {
        self.accumulator.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(StreamSession::new().id(), StreamSession::new().id());
    }

    #[test]
    fn test_session_result_without_final() {
        let mut session = StreamSession::new();
        session.apply(&StreamEvent::Delta { text: "a".into() });
        session.apply(&StreamEvent::Delta { text: "b".into() });
        assert!(!session.received_final());
        assert_eq!(session.into_text(), "ab");
    }

    #[test]
    fn test_session_id_serializes_as_uuid_string() {
        let id = SessionId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json.as_str().unwrap(), id.to_string());
    }
}
