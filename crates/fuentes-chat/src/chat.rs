//! Query orchestration: one submission from user message to finished answer

use futures::StreamExt;
use fuentes_stream::{Backend, CollectionInfo, QueryRequest, decode_events, split_answer};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    conversation::{Conversation, Message},
    error::{Error, Result},
    events::{ChatEvent, QueryState},
    handle::ChatHandle,
    session::{SessionId, StreamSession},
};

/// Text shown in place of an answer when a query fails
pub const DEFAULT_ERROR_MESSAGE: &str = "Error al procesar la consulta";

/// Text shown in place of an answer when the user cancels
pub const DEFAULT_CANCELLED_MESSAGE: &str = "Consulta cancelada";

/// Chat configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Content of the assistant message appended on failure
    pub error_message: String,
    /// Content of the assistant message appended on cancellation
    pub cancelled_message: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            cancelled_message: DEFAULT_CANCELLED_MESSAGE.to_string(),
        }
    }
}

/// How a submission ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty query or no collections; nothing happened
    Rejected,
    /// An answer was appended
    Completed,
    /// The query failed and an error message was appended
    Failed,
    /// The user aborted and a cancellation message was appended
    Cancelled,
}

/// The controller that owns the conversation and runs queries against a backend
pub struct Chat {
    config: ChatConfig,
    conversation: Mutex<Conversation>,
    backend: Arc<dyn Backend>,
    event_tx: broadcast::Sender<ChatEvent>,
    handle: ChatHandle,
}

impl Chat {
    /// Create a new chat
    pub fn new(config: ChatConfig, backend: Arc<dyn Backend>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            config,
            conversation: Mutex::new(Conversation::new()),
            backend,
            event_tx,
            handle: ChatHandle::new(),
        }
    }

    /// Subscribe to chat events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Snapshot of the conversation so far
    pub fn messages(&self) -> Vec<Message> {
        self.conversation.lock().messages().to_vec()
    }

    /// Get a cloneable handle for cancelling from external code.
    pub fn handle(&self) -> ChatHandle {
        self.handle.clone()
    }

    /// Abort the in-flight query
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Whether a query is in flight
    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// List the collections the backend can search
    pub async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        Ok(self.backend.list_collections().await?)
    }

    /// Submit a query and run it to completion.
    ///
    /// The query is trimmed first. An empty query or an empty collection
    /// selection is a silent no-op. A submission while another one is in
    /// flight fails with [`Error::Busy`]. Every accepted submission appends
    /// the user message and then exactly one assistant message.
    pub async fn submit(&self, query: &str, collections: &[String]) -> Result<SubmitOutcome> {
        let query = query.trim();
        if query.is_empty() || collections.is_empty() {
            tracing::debug!(
                "Ignoring submission (query empty: {}, collections: {})",
                query.is_empty(),
                collections.len()
            );
            return Ok(SubmitOutcome::Rejected);
        }

        let guard = self.handle.try_start().ok_or(Error::Busy)?;
        let session = StreamSession::new();
        let id = session.id();
        tracing::debug!("Session {} started: {:?} over {:?}", id, query, collections);

        let _ = self.event_tx.send(ChatEvent::SessionStart {
            session_id: id,
            query: query.to_string(),
            collections: collections.to_vec(),
        });
        self.append(id, Message::user(query));

        let request = QueryRequest::new(query, collections.to_vec());
        let outcome = self.run_session(session, &request, guard.token()).await;

        self.set_state(id, QueryState::Idle);
        let _ = self.event_tx.send(ChatEvent::SessionEnd { session_id: id });
        tracing::debug!("Session {} ended: {:?}", id, outcome);

        drop(guard);
        Ok(outcome)
    }

    /// Drive one session from request to appended assistant message.
    async fn run_session(
        &self,
        mut session: StreamSession,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> SubmitOutcome {
        let id = session.id();
        self.set_state(id, QueryState::Submitting);

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return self.fail(id, fuentes_stream::Error::Aborted),
            result = self.backend.query(request) => match result {
                Ok(body) => body,
                Err(e) => return self.fail(id, e),
            },
        };

        self.set_state(id, QueryState::Streaming);
        let mut events = decode_events(body);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.fail(id, fuentes_stream::Error::Aborted),
                next = events.next() => next,
            };

            match next {
                Some(Ok(event)) => {
                    let text = session.apply(&event).to_string();
                    let _ = self.event_tx.send(ChatEvent::Update {
                        session_id: id,
                        text,
                    });
                }
                Some(Err(e)) => return self.fail(id, e),
                None => break,
            }
        }

        self.set_state(id, QueryState::Finalizing);
        if !session.received_final() {
            tracing::debug!("Session {} ended without a final frame", id);
        }
        let answer = split_answer(&session.into_text());
        self.append(id, Message::assistant(answer));
        SubmitOutcome::Completed
    }

    /// Move the session to `Errored` and append the message shown in place
    /// of an answer.
    fn fail(&self, id: SessionId, error: fuentes_stream::Error) -> SubmitOutcome {
        let (content, outcome) = match error {
            fuentes_stream::Error::Aborted => {
                tracing::debug!("Session {} cancelled", id);
                (&self.config.cancelled_message, SubmitOutcome::Cancelled)
            }
            ref e => {
                tracing::error!("Session {} failed: {}", id, e);
                (&self.config.error_message, SubmitOutcome::Failed)
            }
        };

        self.set_state(id, QueryState::Errored);
        let _ = self.event_tx.send(ChatEvent::Error {
            session_id: id,
            message: error.to_string(),
        });
        self.append(id, Message::error(content.clone()));
        outcome
    }

    fn set_state(&self, id: SessionId, state: QueryState) {
        let _ = self.event_tx.send(ChatEvent::StateChanged {
            session_id: id,
            state,
        });
    }

    fn append(&self, id: SessionId, message: Message) {
        self.conversation.lock().push(message.clone());
        let _ = self.event_tx.send(ChatEvent::MessageAppended {
            session_id: id,
            message,
        });
    }
}
