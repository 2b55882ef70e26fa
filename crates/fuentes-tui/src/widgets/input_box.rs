//! Single-line query input with history recall

use crate::input::Action;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Maximum number of remembered queries
const HISTORY_LIMIT: usize = 100;

/// Single-line text input widget
#[derive(Debug, Default)]
pub struct InputBox {
    /// Current input text
    content: String,
    /// Cursor position (character index, not byte index)
    cursor: usize,
    /// Horizontal scroll offset (in display width)
    scroll: usize,
    placeholder: String,
    title: String,
    focused: bool,
    /// Submitted entries, oldest first
    history: Vec<String>,
    /// Position while browsing history; `None` when editing a fresh line
    history_pos: Option<usize>,
    /// Line being edited before browsing started
    draft: String,
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set placeholder text
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Set the border title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    /// Get the current content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Set the content and move the cursor to its end
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.cursor = self.content.chars().count();
        self.scroll = 0;
    }

    /// Clear the content
    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.scroll = 0;
    }

    /// Take the content for submission, recording it in history
    pub fn take(&mut self) -> String {
        let content = std::mem::take(&mut self.content);
        self.clear();
        self.history_pos = None;
        self.draft.clear();
        if !content.trim().is_empty() && self.history.last() != Some(&content) {
            if self.history.len() >= HISTORY_LIMIT {
                self.history.remove(0);
            }
            self.history.push(content.clone());
        }
        content
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    /// Remove the characters in `start..end` (character indices)
    fn remove_chars(&mut self, start: usize, end: usize) {
        let start_byte = self.byte_offset(start);
        let end_byte = self.byte_offset(end);
        self.content.drain(start_byte..end_byte);
    }

    /// Get the display width of text before the cursor
    fn cursor_display_width(&self) -> usize {
        self.content
            .chars()
            .take(self.cursor)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    fn insert_char(&mut self, c: char) {
        let byte_offset = self.byte_offset(self.cursor);
        self.content.insert(byte_offset, c);
        self.cursor += 1;
    }

    fn history_prev(&mut self) -> bool {
        let pos = match self.history_pos {
            None if self.history.is_empty() => return false,
            None => {
                self.draft = self.content.clone();
                self.history.len() - 1
            }
            Some(0) => return false,
            Some(p) => p - 1,
        };
        self.history_pos = Some(pos);
        let entry = self.history[pos].clone();
        self.set_content(entry);
        true
    }

    fn history_next(&mut self) -> bool {
        let Some(pos) = self.history_pos else {
            return false;
        };
        if pos + 1 < self.history.len() {
            self.history_pos = Some(pos + 1);
            let entry = self.history[pos + 1].clone();
            self.set_content(entry);
        } else {
            self.history_pos = None;
            let draft = std::mem::take(&mut self.draft);
            self.set_content(draft);
        }
        true
    }

    /// Handle an input action. Returns whether the action was consumed.
    pub fn handle_action(&mut self, action: &Action, width: u16) -> bool {
        let char_count = self.content.chars().count();

        let handled = match action {
            Action::Char(c) => {
                self.insert_char(*c);
                true
            }
            Action::Backspace if self.cursor > 0 => {
                self.remove_chars(self.cursor - 1, self.cursor);
                self.cursor -= 1;
                true
            }
            Action::Delete if self.cursor < char_count => {
                self.remove_chars(self.cursor, self.cursor + 1);
                true
            }
            Action::Left if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Action::Right if self.cursor < char_count => {
                self.cursor += 1;
                true
            }
            Action::Home => {
                self.cursor = 0;
                true
            }
            Action::End => {
                self.cursor = char_count;
                true
            }
            Action::Up => self.history_prev(),
            Action::Down => self.history_next(),
            Action::ClearLine => {
                self.clear();
                true
            }
            Action::DeleteWord => {
                let chars: Vec<char> = self.content.chars().collect();
                let mut start = self.cursor;
                while start > 0 && chars[start - 1] == ' ' {
                    start -= 1;
                }
                while start > 0 && chars[start - 1] != ' ' {
                    start -= 1;
                }
                self.remove_chars(start, self.cursor);
                self.cursor = start;
                true
            }
            Action::Paste(text) => {
                // Single line: newlines become one space
                for c in text.chars() {
                    if c == '\n' || c == '\r' {
                        if self.cursor > 0 && !self.content.ends_with(' ') {
                            self.insert_char(' ');
                        }
                    } else {
                        self.insert_char(c);
                    }
                }
                true
            }
            _ => false,
        };

        if handled {
            self.update_scroll(width as usize);
        }
        handled
    }

    fn update_scroll(&mut self, width: usize) {
        // Borders and one column for the cursor
        let visible_width = width.saturating_sub(4).max(1);
        let cursor_pos = self.cursor_display_width();

        if cursor_pos < self.scroll {
            self.scroll = cursor_pos;
        } else if cursor_pos >= self.scroll + visible_width {
            self.scroll = cursor_pos - visible_width + 1;
        }
    }

    /// Text visible in a field `width` columns wide after scrolling
    fn visible_text(&self, width: usize) -> String {
        let mut skipped = 0;
        let mut shown = 0;
        let mut visible = String::new();
        for c in self.content.chars() {
            let w = c.width().unwrap_or(0);
            if skipped < self.scroll {
                skipped += w;
                continue;
            }
            if shown + w > width {
                break;
            }
            visible.push(c);
            shown += w;
        }
        visible
    }

    /// Render the input box
    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title.as_str())
            .border_style(if self.focused {
                theme.accent_style()
            } else {
                theme.border_style()
            });

        let inner = block.inner(area);
        block.render(area, buf);

        let (display_text, style) = if self.content.is_empty() {
            (self.placeholder.clone(), theme.dim_style())
        } else {
            (self.visible_text(inner.width as usize), theme.base_style())
        };
        Paragraph::new(display_text).style(style).render(inner, buf);

        if self.focused && inner.width > 0 {
            let cursor_x = self.cursor_display_width().saturating_sub(self.scroll);
            if cursor_x < inner.width as usize {
                let x = inner.x + cursor_x as u16;
                if let Some(cell) = buf.cell_mut((x, inner.y)) {
                    cell.set_style(Style::default().bg(theme.accent));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputBox {
        let mut input = InputBox::new();
        for c in text.chars() {
            input.handle_action(&Action::Char(c), 80);
        }
        input
    }

    #[test]
    fn test_typing_and_backspace_multibyte() {
        let mut input = typed("canción");
        assert!(input.handle_action(&Action::Backspace, 80));
        assert_eq!(input.content(), "canció");
        input.handle_action(&Action::Left, 80);
        input.handle_action(&Action::Backspace, 80);
        assert_eq!(input.content(), "cancó");
    }

    #[test]
    fn test_backspace_at_start_not_consumed() {
        let mut input = InputBox::new();
        assert!(!input.handle_action(&Action::Backspace, 80));
    }

    #[test]
    fn test_delete_word() {
        let mut input = typed("qué dice la ley  ");
        input.handle_action(&Action::DeleteWord, 80);
        assert_eq!(input.content(), "qué dice la ");
    }

    #[test]
    fn test_paste_flattens_newlines() {
        let mut input = InputBox::new();
        input.handle_action(&Action::Paste("uno\r\ndos\n".into()), 80);
        assert_eq!(input.content(), "uno dos ");
    }

    #[test]
    fn test_take_records_history() {
        let mut input = typed("primera");
        assert_eq!(input.take(), "primera");
        assert_eq!(input.content(), "");

        for c in "segunda".chars() {
            input.handle_action(&Action::Char(c), 80);
        }
        input.take();
        input.handle_action(&Action::Char('x'), 80);

        assert!(input.handle_action(&Action::Up, 80));
        assert_eq!(input.content(), "segunda");
        assert!(input.handle_action(&Action::Up, 80));
        assert_eq!(input.content(), "primera");
        assert!(!input.handle_action(&Action::Up, 80));

        input.handle_action(&Action::Down, 80);
        assert_eq!(input.content(), "segunda");
        input.handle_action(&Action::Down, 80);
        assert_eq!(input.content(), "x");
    }

    #[test]
    fn test_blank_and_repeated_entries_not_recorded() {
        let mut input = typed("   ");
        input.take();
        assert!(!input.handle_action(&Action::Up, 80));

        let mut input = typed("a");
        input.take();
        input.set_content("a");
        input.take();
        input.handle_action(&Action::Up, 80);
        assert!(!input.handle_action(&Action::Up, 80));
    }

    #[test]
    fn test_scroll_keeps_cursor_visible() {
        let mut input = InputBox::new();
        for _ in 0..30 {
            input.handle_action(&Action::Char('a'), 14);
        }
        let visible = input.visible_text(12);
        assert!(visible.chars().count() <= 12);
        assert!(input.cursor_display_width() - input.scroll < 12);
    }
}
