//! fuentes-stream: Client-side decoding of streamed RAG answers
//!
//! This crate talks to the retrieval backend and turns its streamed
//! response body into events, live answer text, and cited sources.

pub mod backend;
pub mod citations;
pub mod error;
pub mod frame;
pub mod stream;
pub mod types;

pub use backend::{Backend, DEFAULT_BASE_URL, HttpBackend};
pub use citations::{Answer, split_answer};
pub use error::{Error, Result};
pub use frame::{Frame, FrameDecoder};
pub use stream::{ByteStream, EventStream, StreamAccumulator, StreamEvent, decode_events};
pub use types::*;
