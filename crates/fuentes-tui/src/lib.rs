//! fuentes-tui: Terminal UI components
//!
//! Widgets for a question/answer chat with cited sources, built on
//! ratatui and crossterm.

pub mod app;
pub mod input;
pub mod theme;
pub mod widgets;

pub use app::App;
pub use theme::Theme;
