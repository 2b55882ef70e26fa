//! TUI implementation for fuentes

use tokio::sync::mpsc;

use crossterm::event::{Event, EventStream, MouseEventKind};
use fuentes_chat::{Chat, ChatEvent, Error as ChatError, Message, QueryState, SessionId};
use fuentes_stream::split_answer;
use fuentes_tui::{
    App, Theme,
    input::Action,
    widgets::{InputBox, MessageList, Spinner, message_list::ChatMessage},
};
use futures::StreamExt;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use std::time::Instant;

use crate::commands::{CommandResult, execute_command, format_collections};
use crate::utils::{one_line, truncate_chars};

/// Messages sent from UI to the query driver
#[derive(Debug)]
pub enum UiMessage {
    /// User submitted a query
    Submit(String),
    /// Slash command
    Command(String),
    /// User requested abort of the current query
    Abort,
    /// User requested quit
    Quit,
}

/// TUI application state
pub struct TuiState {
    /// Finished messages, mirrored from the conversation
    messages: Vec<ChatMessage>,
    /// Answer currently streaming in
    pending: Option<ChatMessage>,
    input: InputBox,
    /// Current scroll position
    scroll: usize,
    query_state: QueryState,
    /// Session whose events are shown; others are stale
    active_session: Option<SessionId>,
    status: String,
    theme: Theme,
    /// Collections searched by the next query
    collections: Vec<String>,
    backend_url: String,
    /// Channel to send messages to the query driver
    ui_tx: mpsc::Sender<UiMessage>,
    /// Spinner start time for animation
    spinner_start: Instant,
}

impl TuiState {
    pub fn new(
        collections: Vec<String>,
        backend_url: String,
        theme: Theme,
        ui_tx: mpsc::Sender<UiMessage>,
    ) -> Self {
        let mut input = InputBox::new().with_placeholder("Ask a question...");
        input.set_focused(true);

        let mut state = Self {
            messages: vec![],
            pending: None,
            input,
            scroll: 0,
            query_state: QueryState::Idle,
            active_session: None,
            status: "Ready".to_string(),
            theme,
            collections: Vec::new(),
            backend_url,
            ui_tx,
            spinner_start: Instant::now(),
        };
        state.set_collections(collections);
        state
    }

    fn set_collections(&mut self, collections: Vec<String>) {
        let title = if collections.is_empty() {
            " no collections selected ".to_string()
        } else {
            format!(" {} ", collections.join(", "))
        };
        self.input.set_title(title);
        self.collections = collections;
    }

    /// Whether a query is in flight
    fn is_busy(&self) -> bool {
        self.active_session.is_some() || self.query_state.is_loading()
    }

    /// Handle chat events
    pub fn handle_chat_event(&mut self, event: ChatEvent) {
        if let ChatEvent::SessionStart { session_id, .. } = &event {
            self.active_session = Some(*session_id);
            self.spinner_start = Instant::now();
            self.pending = Some(ChatMessage::streaming(""));
            self.status = "Searching collections...".to_string();
            self.scroll_to_bottom();
            return;
        }

        if self.active_session != Some(event.session_id()) {
            tracing::debug!("Dropping event from stale session {}", event.session_id());
            return;
        }

        match event {
            ChatEvent::SessionStart { .. } => {}
            ChatEvent::StateChanged { state, .. } => {
                self.query_state = state;
                match state {
                    QueryState::Submitting => self.status = "Sending query...".to_string(),
                    QueryState::Streaming => self.status = "Receiving answer...".to_string(),
                    QueryState::Finalizing | QueryState::Idle | QueryState::Errored => {}
                }
            }
            ChatEvent::Update { text, .. } => {
                let answer = split_answer(&text);
                self.pending = Some(ChatMessage {
                    sources: answer.sources,
                    ..ChatMessage::streaming(answer.content)
                });
                self.scroll_to_bottom();
            }
            ChatEvent::MessageAppended { message, .. } => {
                if !message.is_user() {
                    self.pending = None;
                    if !message.is_error() {
                        self.status = "Ready".to_string();
                    }
                }
                self.messages.push(to_chat_message(&message));
                self.scroll_to_bottom();
            }
            ChatEvent::Error { message, .. } => {
                self.status = format!("Error: {}", truncate_chars(&one_line(&message), 120));
            }
            ChatEvent::SessionEnd { .. } => {
                self.pending = None;
                self.active_session = None;
                self.query_state = QueryState::Idle;
            }
        }
    }

    fn scroll_to_bottom(&mut self) {
        // Will be calculated during render based on content height
        self.scroll = usize::MAX;
    }

    /// Show a system message
    pub fn show_system_message(&mut self, content: &str) {
        self.messages.push(ChatMessage::system(content));
        self.scroll_to_bottom();
    }

    /// Handle keyboard action. Returns false when the UI should exit.
    pub async fn handle_action(&mut self, action: Action, width: u16) -> bool {
        match action {
            Action::Submit => {
                if self.is_busy() {
                    return true;
                }
                let content = self.input.take();
                let content = content.trim();
                if content.is_empty() {
                    return true;
                }

                if content.starts_with('/') {
                    let _ = self.ui_tx.send(UiMessage::Command(content.to_string())).await;
                } else if self.collections.is_empty() {
                    self.show_system_message(
                        "Select at least one collection first: /use <name>[,<name>...]\nSee /collections for what the backend offers.",
                    );
                } else {
                    let _ = self.ui_tx.send(UiMessage::Submit(content.to_string())).await;
                }
                true
            }
            Action::Quit => {
                let _ = self.ui_tx.send(UiMessage::Quit).await;
                false
            }
            Action::Interrupt | Action::Escape => {
                if self.is_busy() {
                    let _ = self.ui_tx.send(UiMessage::Abort).await;
                    self.status = "Cancelling...".to_string();
                    true
                } else {
                    let _ = self.ui_tx.send(UiMessage::Quit).await;
                    false
                }
            }
            Action::Eof if self.input.content().is_empty() => {
                let _ = self.ui_tx.send(UiMessage::Quit).await;
                false
            }
            Action::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                true
            }
            Action::PageDown => {
                self.scroll = self.scroll.saturating_add(10);
                true
            }
            _ => {
                self.input.handle_action(&action, width);
                true
            }
        }
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        // Layout: messages (flex), status bar (1), input (3)
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(size);

        self.render_messages(frame, chunks[0]);
        self.render_status(frame, chunks[1]);
        self.input.render(chunks[2], frame.buffer_mut(), &self.theme);
    }

    fn render_messages(&mut self, frame: &mut Frame, area: Rect) {
        let title = format!(" fuentes │ {} ", self.backend_url);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title(title);

        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.height == 0 || (self.messages.is_empty() && self.pending.is_none()) {
            frame.render_widget(self.welcome(), inner);
            return;
        }

        let content_height = fuentes_tui::widgets::message_list::calculate_message_height(
            &self.messages,
            self.pending.as_ref(),
            inner.width as usize,
        );

        if self.scroll == usize::MAX {
            // Auto-scroll to bottom
            self.scroll = content_height.saturating_sub(inner.height as usize);
        } else {
            self.scroll = self
                .scroll
                .min(content_height.saturating_sub(inner.height as usize));
        }

        let message_list = MessageList::new(&self.messages, &self.theme)
            .pending(self.pending.as_ref())
            .scroll(self.scroll);
        frame.render_widget(message_list, inner);

        if content_height > inner.height as usize {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");

            let mut scrollbar_state = ScrollbarState::new(content_height)
                .position(self.scroll)
                .viewport_content_length(inner.height as usize);

            frame.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
        }
    }

    fn welcome(&self) -> Paragraph<'static> {
        let theme = &self.theme;
        let key = |k: &'static str, what: &'static str| {
            Line::from(vec![
                Span::styled(k, theme.accent_style()),
                Span::styled(what, theme.base_style()),
            ])
        };
        let searching = if self.collections.is_empty() {
            "  No collections selected. Use /collections and /use <name>.".to_string()
        } else {
            format!("  Searching: {}", self.collections.join(", "))
        };

        Paragraph::new(vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("  fuentes", theme.accent_bold()),
                Span::styled(" - answers with cited sources", theme.dim_style()),
            ]),
            Line::from(""),
            Line::from(Span::styled(searching, theme.dim_style())),
            Line::from(""),
            Line::from(""),
            Line::from(Span::styled("  Keybindings", theme.sources_heading())),
            Line::from(""),
            key("    Enter     ", "Ask"),
            key("    Up/Down   ", "Previous questions"),
            key("    Esc       ", "Cancel answer"),
            key("    Ctrl+C    ", "Cancel / Quit"),
            key("    PgUp/Dn   ", "Scroll history"),
            Line::from(""),
            Line::from(Span::styled(
                "  Type a question to get started, or /help for commands...",
                theme.dim_style(),
            )),
        ])
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if self.is_busy() {
            let spinner =
                Spinner::new(&self.status, &self.theme).with_start_time(self.spinner_start);
            frame.render_widget(spinner, area);
            return;
        }

        let left_content = self.status.clone();
        let right_content = "/help │ Esc: cancel │ Ctrl+C: quit";

        let left_width = left_content.chars().count();
        let right_width = right_content.chars().count();
        let available = area.width as usize;

        let line = if left_width + right_width + 2 <= available {
            let spacing = available - left_width - right_width;
            Line::from(vec![
                Span::styled(left_content, self.theme.dim_style()),
                Span::raw(" ".repeat(spacing)),
                Span::styled(right_content, self.theme.dim_style()),
            ])
        } else {
            Line::from(Span::styled(left_content, self.theme.dim_style()))
        };

        frame.render_widget(Paragraph::new(line), area);
    }
}

fn to_chat_message(message: &Message) -> ChatMessage {
    match message {
        Message::User { content, .. } => ChatMessage::user(content.as_str()),
        Message::Assistant { content, error: true, .. } => ChatMessage::error(content.as_str()),
        Message::Assistant {
            content, sources, ..
        } => ChatMessage::assistant(content.as_str(), sources.clone()),
    }
}

/// Run the TUI application
pub async fn run_tui(
    chat: &Chat,
    collections: Vec<String>,
    backend_url: String,
    theme: Theme,
) -> anyhow::Result<()> {
    let mut app = App::new()?;

    let (ui_tx, mut ui_rx) = mpsc::channel::<UiMessage>(32);
    let mut state = TuiState::new(collections, backend_url, theme, ui_tx);

    let mut chat_rx = chat.subscribe();
    let mut event_stream = EventStream::new();

    // Tick interval for animations (80ms for smooth spinner)
    let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(80));

    // Query to start at the top of the next loop iteration
    let mut pending_query: Option<String> = None;

    loop {
        if let Some(query) = pending_query.take() {
            let handle = chat.handle();
            let selection = state.collections.clone();
            let mut submit = std::pin::pin!(chat.submit(&query, &selection));

            loop {
                app.draw(|frame| state.render(frame))?;
                let area_width = app.width()?;

                tokio::select! {
                    biased;

                    result = &mut submit => {
                        match result {
                            Ok(outcome) => tracing::debug!("Query finished: {:?}", outcome),
                            Err(ChatError::Busy) => {
                                state.show_system_message("A query is already running");
                            }
                            Err(e) => state.status = format!("Error: {}", e),
                        }
                        break;
                    }

                    event = chat_rx.recv() => {
                        if let Ok(chat_event) = event {
                            state.handle_chat_event(chat_event);
                        }
                    }

                    // Input stays live while the answer streams
                    event = event_stream.next() => {
                        match event {
                            Some(Ok(Event::Key(key))) => {
                                match fuentes_tui::input::key_to_action(key) {
                                    Action::Interrupt | Action::Escape => {
                                        handle.abort();
                                        state.status = "Cancelling...".to_string();
                                    }
                                    Action::Quit => {
                                        handle.abort();
                                        return Ok(());
                                    }
                                    Action::PageUp => state.scroll = state.scroll.saturating_sub(10),
                                    Action::PageDown => state.scroll = state.scroll.saturating_add(10),
                                    action => {
                                        state.input.handle_action(&action, area_width);
                                    }
                                }
                            }
                            Some(Ok(Event::Paste(text))) => {
                                state.input.handle_action(&Action::Paste(text), area_width);
                            }
                            Some(Ok(Event::Mouse(mouse))) => scroll_with_mouse(&mut state, mouse.kind),
                            Some(Err(_)) | None => {
                                handle.abort();
                                return Ok(());
                            }
                            _ => {}
                        }
                    }

                    _ = tick_interval.tick() => {}
                }
            }

            // Drain events published after the submit future completed
            while let Ok(chat_event) = chat_rx.try_recv() {
                state.handle_chat_event(chat_event);
            }
            continue;
        }

        app.draw(|frame| state.render(frame))?;
        let area_width = app.width()?;

        tokio::select! {
            biased;

            event = chat_rx.recv() => {
                if let Ok(chat_event) = event {
                    state.handle_chat_event(chat_event);
                }
            }

            event = event_stream.next() => {
                match event {
                    Some(Ok(Event::Key(key))) => {
                        let action = fuentes_tui::input::key_to_action(key);
                        if !state.handle_action(action, area_width).await {
                            break;
                        }
                    }
                    Some(Ok(Event::Paste(text))) => {
                        state.handle_action(Action::Paste(text), area_width).await;
                    }
                    Some(Ok(Event::Mouse(mouse))) => scroll_with_mouse(&mut state, mouse.kind),
                    Some(Ok(Event::Resize(_, _))) => {}
                    Some(Err(e)) => {
                        return Err(anyhow::anyhow!("Event error: {}", e));
                    }
                    None => break,
                    _ => {}
                }
            }

            _ = tick_interval.tick() => {}

            msg = ui_rx.recv() => {
                match msg {
                    Some(UiMessage::Submit(query)) => {
                        pending_query = Some(query);
                    }
                    Some(UiMessage::Command(input)) => {
                        match execute_command(&input, &state.collections) {
                            Some(CommandResult::Message(msg)) => state.show_system_message(&msg),
                            Some(CommandResult::ListCollections) => {
                                state.status = "Listing collections...".to_string();
                                match chat.list_collections().await {
                                    Ok(list) => {
                                        let text = format_collections(&list, &state.collections);
                                        state.show_system_message(&text);
                                        state.status = "Ready".to_string();
                                    }
                                    Err(e) => {
                                        state.show_system_message(&format!("Failed to list collections: {}", e));
                                        state.status = "Ready".to_string();
                                    }
                                }
                            }
                            Some(CommandResult::UseCollections(names)) => {
                                state.show_system_message(&format!("Searching: {}", names.join(", ")));
                                state.set_collections(names);
                            }
                            Some(CommandResult::Exit) => break,
                            Some(CommandResult::Unknown(cmd)) => {
                                state.show_system_message(&format!(
                                    "Unknown command: /{}\nType /help for available commands.",
                                    cmd
                                ));
                            }
                            None => {}
                        }
                    }
                    Some(UiMessage::Abort) => chat.abort(),
                    Some(UiMessage::Quit) | None => break,
                }
            }
        }
    }

    Ok(())
}

fn scroll_with_mouse(state: &mut TuiState, kind: MouseEventKind) {
    match kind {
        MouseEventKind::ScrollUp => state.scroll = state.scroll.saturating_sub(3),
        MouseEventKind::ScrollDown => state.scroll = state.scroll.saturating_add(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuentes_stream::Answer;

    fn state(collections: &[&str]) -> (TuiState, mpsc::Receiver<UiMessage>) {
        let (tx, rx) = mpsc::channel(8);
        let collections = collections.iter().map(|c| c.to_string()).collect();
        let state = TuiState::new(collections, "http://localhost:8000".into(), Theme::dark(), tx);
        (state, rx)
    }

    fn start(state: &mut TuiState) -> SessionId {
        let id = SessionId::new();
        state.handle_chat_event(ChatEvent::SessionStart {
            session_id: id,
            query: "q".into(),
            collections: vec!["leyes".into()],
        });
        id
    }

    #[test]
    fn test_update_shows_split_pending_answer() {
        let (mut state, _rx) = state(&["leyes"]);
        let id = start(&mut state);
        state.handle_chat_event(ChatEvent::Update {
            session_id: id,
            text: "Hola\n\nFuentes:\nFuente [1] a".into(),
        });

        let pending = state.pending.as_ref().unwrap();
        assert!(pending.is_streaming);
        assert_eq!(pending.content, "Hola");
        assert_eq!(pending.sources, vec!["Fuente [1] a"]);
    }

    #[test]
    fn test_stale_session_events_dropped() {
        let (mut state, _rx) = state(&["leyes"]);
        let id = start(&mut state);
        state.handle_chat_event(ChatEvent::Update {
            session_id: SessionId::new(),
            text: "otra".into(),
        });
        assert_eq!(state.pending.as_ref().unwrap().content, "");

        state.handle_chat_event(ChatEvent::SessionEnd { session_id: id });
        assert!(!state.is_busy());
        state.handle_chat_event(ChatEvent::MessageAppended {
            session_id: id,
            message: Message::user("tarde"),
        });
        assert!(state.messages.is_empty());
    }

    #[test]
    fn test_final_message_replaces_pending() {
        let (mut state, _rx) = state(&["leyes"]);
        let id = start(&mut state);
        state.handle_chat_event(ChatEvent::MessageAppended {
            session_id: id,
            message: Message::user("q"),
        });
        state.handle_chat_event(ChatEvent::Update {
            session_id: id,
            text: "Ho".into(),
        });
        state.handle_chat_event(ChatEvent::MessageAppended {
            session_id: id,
            message: Message::assistant(Answer {
                content: "Hola".into(),
                sources: vec!["Fuente [1] a".into()],
            }),
        });
        state.handle_chat_event(ChatEvent::SessionEnd { session_id: id });

        assert!(state.pending.is_none());
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].content, "Hola");
        assert_eq!(state.messages[1].sources.len(), 1);
        assert!(!state.is_busy());
    }

    #[test]
    fn test_error_message_marked() {
        let (mut state, _rx) = state(&["leyes"]);
        let id = start(&mut state);
        state.handle_chat_event(ChatEvent::Error {
            session_id: id,
            message: "backend returned 500".into(),
        });
        state.handle_chat_event(ChatEvent::MessageAppended {
            session_id: id,
            message: Message::error("Error al procesar la consulta"),
        });
        assert!(state.messages[0].is_error);
        assert!(state.status.contains("500"));
    }

    #[tokio::test]
    async fn test_submit_without_collections_shows_hint() {
        let (mut state, mut rx) = state(&[]);
        state.input.set_content("¿Qué dice?");
        assert!(state.handle_action(Action::Submit, 80).await);
        assert!(rx.try_recv().is_err());
        assert_eq!(state.messages.len(), 1);
        assert!(state.messages[0].content.contains("/use"));
    }

    #[tokio::test]
    async fn test_submit_sends_trimmed_query() {
        let (mut state, mut rx) = state(&["leyes"]);
        state.input.set_content("  hola  ");
        state.handle_action(Action::Submit, 80).await;
        match rx.try_recv() {
            Ok(UiMessage::Submit(q)) => assert_eq!(q, "hola"),
            other => panic!("expected submit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_escape_while_busy_aborts() {
        let (mut state, mut rx) = state(&["leyes"]);
        start(&mut state);
        assert!(state.handle_action(Action::Escape, 80).await);
        assert!(matches!(rx.try_recv(), Ok(UiMessage::Abort)));
    }
}
