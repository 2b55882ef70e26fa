//! Message list widget for displaying questions, answers and their sources

use crate::theme::Theme;
use crate::widgets::spinner;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use std::time::{SystemTime, UNIX_EPOCH};

/// Heading shown above the cited sources of an answer
pub const SOURCES_HEADING: &str = "Fuentes";

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    /// Local notices (command output, listings)
    System,
}

/// A single message in the chat
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Cited sources, shown under the answer
    pub sources: Vec<String>,
    pub is_error: bool,
    /// Provisional text of an answer still arriving
    pub is_streaming: bool,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            sources: Vec::new(),
            is_error: false,
            is_streaming: false,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a finished answer
    pub fn assistant(content: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            sources,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Create an answer that is still streaming
    pub fn streaming(content: impl Into<String>) -> Self {
        Self {
            is_streaming: true,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Create an error shown in place of an answer
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Lay out one message as display lines for the given width.
pub fn message_lines(msg: &ChatMessage, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let (role_text, role_style, prefix) = match msg.role {
        Role::User => ("You", theme.accent_bold(), "▶ "),
        Role::Assistant if msg.is_error => ("Assistant", theme.error_style(), "◀ "),
        Role::Assistant => ("Assistant", theme.answer_bold(), "◀ "),
        Role::System => ("System", theme.dim_style(), "● "),
    };
    let header = if msg.is_streaming {
        format!("{}{} ▌", prefix, role_text)
    } else {
        format!("{}{}", prefix, role_text)
    };
    lines.push(Line::from(Span::styled(header, role_style)));

    let content_width = width.saturating_sub(2).max(1);

    if msg.is_streaming && msg.content.is_empty() {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        lines.push(Line::from(Span::styled(
            format!("  {} Searching collections...", spinner::frame_at(elapsed)),
            theme.accent_style(),
        )));
    } else {
        let content_style = if msg.is_error {
            theme.error_style()
        } else if msg.role == Role::System {
            theme.dim_style()
        } else {
            theme.base_style()
        };
        for line in textwrap::wrap(&msg.content, content_width) {
            lines.push(Line::from(Span::styled(format!("  {}", line), content_style)));
        }
    }

    if !msg.sources.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  {}", SOURCES_HEADING),
            theme.sources_heading(),
        )));
        let source_width = width.saturating_sub(4).max(1);
        for source in &msg.sources {
            for (i, line) in textwrap::wrap(source, source_width).into_iter().enumerate() {
                let indent = if i == 0 { "  • " } else { "    " };
                lines.push(Line::from(Span::styled(
                    format!("{}{}", indent, line),
                    theme.source_style(),
                )));
            }
        }
    }

    // Separator
    lines.push(Line::from(""));
    lines
}

/// Widget for displaying a list of chat messages, optionally followed by
/// the answer currently streaming in.
pub struct MessageList<'a> {
    messages: &'a [ChatMessage],
    pending: Option<&'a ChatMessage>,
    theme: &'a Theme,
    scroll: usize,
}

impl<'a> MessageList<'a> {
    pub fn new(messages: &'a [ChatMessage], theme: &'a Theme) -> Self {
        Self {
            messages,
            pending: None,
            theme,
            scroll: 0,
        }
    }

    /// Show a provisional message after the list
    pub fn pending(mut self, pending: Option<&'a ChatMessage>) -> Self {
        self.pending = pending;
        self
    }

    /// Set scroll offset
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let width = area.width as usize;
        let visible_lines: Vec<Line> = self
            .messages
            .iter()
            .chain(self.pending)
            .flat_map(|msg| message_lines(msg, self.theme, width))
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();

        Paragraph::new(visible_lines).render(area, buf);
    }
}

/// Calculate total height of messages
pub fn calculate_message_height(
    messages: &[ChatMessage],
    pending: Option<&ChatMessage>,
    width: usize,
) -> usize {
    let theme = Theme::dark();
    messages
        .iter()
        .chain(pending)
        .map(|msg| message_lines(msg, &theme, width).len())
        .sum()
}
