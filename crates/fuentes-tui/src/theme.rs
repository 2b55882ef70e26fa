//! Color theme support

use ratatui::style::{Color, Modifier, Style};

/// Color theme for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    /// Background color
    pub bg: Color,
    /// Primary text color
    pub fg: Color,
    /// Dimmed/secondary text
    pub dim: Color,
    /// Accent color (highlights, prompts)
    pub accent: Color,
    /// Error color
    pub error: Color,
    /// Answer header color
    pub answer: Color,
    /// Cited source text
    pub source: Color,
    /// Border color
    pub border: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::White,
            dim: Color::DarkGray,
            accent: Color::Cyan,
            error: Color::Red,
            answer: Color::Green,
            source: Color::Gray,
            border: Color::DarkGray,
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            bg: Color::White,
            fg: Color::Black,
            dim: Color::Gray,
            accent: Color::Blue,
            error: Color::Red,
            answer: Color::Rgb(0, 120, 60),
            source: Color::DarkGray,
            border: Color::Gray,
        }
    }

    /// Look up a theme by name; unknown names get the dark theme
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Get base style
    pub fn base_style(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// Get dimmed style
    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    /// Get accent style
    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    /// Get bold accent style
    pub fn accent_bold(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Get error style
    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    /// Header style for assistant answers
    pub fn answer_bold(&self) -> Style {
        Style::default()
            .fg(self.answer)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for the sources heading
    pub fn sources_heading(&self) -> Style {
        Style::default()
            .fg(self.source)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    }

    /// Style for a cited source line
    pub fn source_style(&self) -> Style {
        Style::default().fg(self.source)
    }

    /// Get border style
    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }
}
