//! fuentes-chat: Conversation state and query orchestration
//!
//! This crate runs one query at a time against a retrieval backend,
//! publishes live progress as events, and keeps the resulting
//! conversation.

pub mod chat;
pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod session;

pub use chat::{Chat, ChatConfig, DEFAULT_CANCELLED_MESSAGE, DEFAULT_ERROR_MESSAGE, SubmitOutcome};
pub use conversation::{Conversation, Message};
pub use error::{Error, Result};
pub use events::{ChatEvent, QueryState};
pub use handle::ChatHandle;
pub use session::{SessionId, StreamSession};
