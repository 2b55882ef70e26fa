//! Streaming event types and utilities

use std::pin::Pin;

use async_stream::stream;
use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_stream::Stream;

use crate::error::{Error, Result};
use crate::frame::{Frame, FrameDecoder};

/// Events decoded from the answer stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental fragment to append
    Delta { text: String },
    /// Complete, authoritative answer text (answer + citations block)
    Final { text: String },
}

impl StreamEvent {
    /// Check if this is the final event
    pub fn is_final(&self) -> bool {
        matches!(self, StreamEvent::Final { .. })
    }

    /// The text carried by the event
    pub fn text(&self) -> &str {
        match self {
            StreamEvent::Delta { text } | StreamEvent::Final { text } => text,
        }
    }
}

/// Raw response body as it arrives from the transport
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A stream of decoded events. An `Err` item is a transport failure and is
/// always the last item.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Interpret one frame payload (the part after `data: `).
///
/// A truthy `done` makes the frame final and requires a string `text`.
/// Anything else is a delta; a missing or null `delta` is an empty delta.
pub fn interpret(payload: &str) -> Result<StreamEvent> {
    let value: Value = serde_json::from_str(payload)?;

    if value.get("done").is_some_and(is_truthy) {
        let text = value
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::UnexpectedResponse("final frame without text".to_string()))?;
        return Ok(StreamEvent::Final {
            text: text.to_string(),
        });
    }

    match value.get("delta") {
        None | Some(Value::Null) => Ok(StreamEvent::Delta {
            text: String::new(),
        }),
        Some(Value::String(delta)) => Ok(StreamEvent::Delta {
            text: delta.clone(),
        }),
        Some(other) => Err(Error::UnexpectedResponse(format!(
            "delta is not a string: {}",
            other
        ))),
    }
}

/// JSON truthiness as the backend's clients understand it
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Turn a raw body into a stream of events.
///
/// Malformed frames are logged and skipped. A transport error is yielded
/// once and ends the stream.
pub fn decode_events(mut body: ByteStream) -> EventStream {
    Box::pin(stream! {
        let mut decoder = FrameDecoder::new();

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for frame in decoder.push(&bytes) {
                        if let Some(event) = interpret_frame(&frame) {
                            yield Ok(event);
                        }
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        for frame in decoder.finish() {
            if let Some(event) = interpret_frame(&frame) {
                yield Ok(event);
            }
        }
    })
}

fn interpret_frame(frame: &Frame) -> Option<StreamEvent> {
    match interpret(frame.payload()) {
        Ok(event) => Some(event),
        Err(e) => {
            let preview: String = frame.raw().chars().take(120).collect();
            tracing::warn!("Skipping malformed frame: {} ({})", e, preview);
            None
        }
    }
}

/// Folds stream events into the live answer text
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    live_text: String,
    final_seen: bool,
}

impl StreamAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event and return the updated live text.
    ///
    /// Deltas append. A final event replaces everything accumulated so far.
    pub fn apply(&mut self, event: &StreamEvent) -> &str {
        match event {
            StreamEvent::Delta { text } => {
                self.live_text.push_str(text);
            }
            StreamEvent::Final { text } => {
                self.live_text.clear();
                self.live_text.push_str(text);
                self.final_seen = true;
            }
        }
        &self.live_text
    }

    /// Current live text
    pub fn live_text(&self) -> &str {
        &self.live_text
    }

    /// Whether a final event has been applied
    pub fn is_final(&self) -> bool {
        self.final_seen
    }

    /// Drop all accumulated text
    pub fn clear(&mut self) {
        self.live_text.clear();
        self.final_seen = false;
    }

    /// Consume the accumulator, returning the session result
    pub fn into_text(self) -> String {
        self.live_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(text: &str) -> StreamEvent {
        StreamEvent::Delta { text: text.into() }
    }

    fn final_event(text: &str) -> StreamEvent {
        StreamEvent::Final { text: text.into() }
    }

    fn body(chunks: Vec<&'static str>) -> ByteStream {
        Box::pin(futures::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, Error>(Bytes::from_static(c.as_bytes()))),
        ))
    }

    async fn collect(stream: EventStream) -> Vec<Result<StreamEvent>> {
        stream.collect().await
    }

    // --- interpret ---

    #[test]
    fn test_interpret_delta() {
        assert_eq!(interpret(r#"{"delta":"Hola"}"#).unwrap(), delta("Hola"));
    }

    #[test]
    fn test_interpret_missing_delta_is_empty() {
        assert_eq!(interpret(r#"{"text":"acc"}"#).unwrap(), delta(""));
        assert_eq!(interpret(r#"{"delta":null}"#).unwrap(), delta(""));
        assert_eq!(interpret("{}").unwrap(), delta(""));
    }

    #[test]
    fn test_interpret_final() {
        let e = interpret(r#"{"delta":"","text":"full","done":true}"#).unwrap();
        assert_eq!(e, final_event("full"));
        assert!(e.is_final());
    }

    #[test]
    fn test_interpret_falsy_done_is_delta() {
        assert_eq!(
            interpret(r#"{"delta":"x","text":"t","done":false}"#).unwrap(),
            delta("x")
        );
        assert_eq!(interpret(r#"{"delta":"x","done":0}"#).unwrap(), delta("x"));
        assert_eq!(interpret(r#"{"delta":"x","done":""}"#).unwrap(), delta("x"));
        assert_eq!(interpret(r#"{"delta":"x","done":null}"#).unwrap(), delta("x"));
    }

    #[test]
    fn test_interpret_truthy_non_bool_done() {
        assert_eq!(
            interpret(r#"{"done":1,"text":"t"}"#).unwrap(),
            final_event("t")
        );
        assert_eq!(
            interpret(r#"{"done":"yes","text":"t"}"#).unwrap(),
            final_event("t")
        );
    }

    #[test]
    fn test_interpret_leading_space_payload() {
        // Some producers write "data:  {...}"; JSON tolerates the whitespace
        assert_eq!(interpret(r#" {"delta":"a"}"#).unwrap(), delta("a"));
    }

    #[test]
    fn test_interpret_malformed_json() {
        let err = interpret("{not json").unwrap_err();
        assert!(err.is_frame_failure());
        assert!(interpret("[DONE]").is_err());
    }

    #[test]
    fn test_interpret_final_without_text_is_malformed() {
        let err = interpret(r#"{"done":true}"#).unwrap_err();
        assert!(err.is_frame_failure());
    }

    #[test]
    fn test_interpret_non_string_delta_is_malformed() {
        assert!(interpret(r#"{"delta":42}"#).unwrap_err().is_frame_failure());
    }

    // --- accumulator ---

    #[test]
    fn test_accumulator_concatenates_deltas_at_every_step() {
        let parts = ["Los ", "documentos ", "", "indican", " que..."];
        let mut acc = StreamAccumulator::new();
        let mut expected = String::new();
        for part in parts {
            expected.push_str(part);
            assert_eq!(acc.apply(&delta(part)), expected);
        }
        assert!(!acc.is_final());
        assert_eq!(acc.into_text(), "Los documentos indican que...");
    }

    #[test]
    fn test_accumulator_final_replaces() {
        let mut acc = StreamAccumulator::new();
        acc.apply(&delta("partial "));
        acc.apply(&delta("answer"));
        assert_eq!(acc.apply(&final_event("Full answer")), "Full answer");
        assert!(acc.is_final());
    }

    #[test]
    fn test_accumulator_last_final_wins() {
        let mut acc = StreamAccumulator::new();
        acc.apply(&final_event("first"));
        acc.apply(&final_event("second"));
        assert_eq!(acc.live_text(), "second");
    }

    #[test]
    fn test_accumulator_clear() {
        let mut acc = StreamAccumulator::new();
        acc.apply(&final_event("x"));
        acc.clear();
        assert_eq!(acc.live_text(), "");
        assert!(!acc.is_final());
    }

    // --- decode_events ---

    #[tokio::test]
    async fn test_decode_events_across_chunks() {
        let stream = decode_events(body(vec![
            "data: {\"delta\":\"Ho",
            "la\"}\n\ndata: {\"delta\":\" mundo\"}\n",
            "\ndata: {\"delta\":\"\",\"text\":\"Hola mundo\",\"done\":true}\n\n",
        ]));
        let events: Vec<StreamEvent> = collect(stream)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(
            events,
            vec![delta("Hola"), delta(" mundo"), final_event("Hola mundo")]
        );
    }

    #[tokio::test]
    async fn test_decode_events_skips_malformed_frame() {
        let stream = decode_events(body(vec![
            "data: {\"delta\":\"a\"}\n",
            "data: {broken\n",
            "data: {\"delta\":\"b\"}\n",
        ]));
        let mut acc = StreamAccumulator::new();
        for item in collect(stream).await {
            acc.apply(&item.unwrap());
        }
        assert_eq!(acc.live_text(), "ab");
    }

    #[tokio::test]
    async fn test_decode_events_multibyte_split() {
        let text = "data: {\"delta\":\"información\"}\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let (a, b) = text.split_at(split);
        let chunks: ByteStream = Box::pin(futures::stream::iter(vec![
            Ok::<_, Error>(Bytes::copy_from_slice(a)),
            Ok(Bytes::copy_from_slice(b)),
        ]));
        let events = collect(decode_events(chunks)).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap(), &delta("información"));
    }

    #[tokio::test]
    async fn test_decode_events_flushes_unterminated_final() {
        let stream = decode_events(body(vec![
            "data: {\"delta\":\"a\"}\n",
            "data: {\"done\":true,\"text\":\"A\"}",
        ]));
        let events: Vec<StreamEvent> = collect(stream)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(events, vec![delta("a"), final_event("A")]);
    }

    #[tokio::test]
    async fn test_decode_events_transport_error_ends_stream() {
        let chunks: ByteStream = Box::pin(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"delta\":\"a\"}\n")),
            Err(Error::status(502, "gateway")),
            Ok(Bytes::from_static(b"data: {\"delta\":\"never\"}\n")),
        ]));
        let items = collect(decode_events(chunks)).await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].as_ref().unwrap_err().is_transport_failure());
    }

    #[tokio::test]
    async fn test_decode_events_empty_body() {
        let items = collect(decode_events(body(vec![]))).await;
        assert!(items.is_empty());
    }
}
