//! Incremental printing of streamed answers for line mode

use fuentes_chat::{ChatEvent, Message, SessionId};
use fuentes_stream::citations::SOURCES_HEADER;

/// Heading printed above the sources of an answer
const SOURCES_HEADING: &str = "Fuentes";

/// Turns chat events into text for a plain terminal.
///
/// Only the answer part of the live text is printed while it streams.
/// A tail that could be the start of the sources header is held back until
/// it is resolved, so nothing printed ever has to be taken back.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    session: Option<SessionId>,
    printed: String,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to print for an event, if any
    pub fn on_event(&mut self, event: &ChatEvent) -> Option<String> {
        match event {
            ChatEvent::SessionStart { session_id, .. } => {
                self.session = Some(*session_id);
                self.printed.clear();
                None
            }
            _ if self.session != Some(event.session_id()) => None,
            ChatEvent::Update { text, .. } => self.advance(text),
            ChatEvent::MessageAppended {
                message: message @ Message::Assistant { .. },
                ..
            } => Some(self.finish(message)),
            _ => None,
        }
    }

    /// New answer text since the last call
    fn advance(&mut self, live: &str) -> Option<String> {
        let printable = printable_prefix(live);
        let rest = printable.strip_prefix(self.printed.as_str())?;
        if rest.is_empty() {
            return None;
        }
        let rest = rest.to_string();
        self.printed.push_str(&rest);
        Some(rest)
    }

    /// Remainder of the final message plus its sources block
    fn finish(&mut self, message: &Message) -> String {
        let printed = std::mem::take(&mut self.printed);
        let mut out = String::new();

        if message.is_error() {
            if !printed.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[{}]", message.content()));
        } else {
            match message.content().strip_prefix(printed.as_str()) {
                Some(rest) => out.push_str(rest),
                None => {
                    // The final text replaced what was streamed
                    out.push('\n');
                    out.push_str(message.content());
                }
            }
        }
        out.push('\n');

        let sources = message.sources();
        if !sources.is_empty() {
            out.push_str(&format!("\n{}\n", SOURCES_HEADING));
            for source in sources {
                out.push_str(&format!("  • {}\n", source));
            }
        }
        out
    }
}

/// Longest prefix of the live text that is known to be answer content
fn printable_prefix(live: &str) -> &str {
    if let Some((content, _)) = live.split_once(SOURCES_HEADER) {
        return content;
    }
    for len in (1..SOURCES_HEADER.len()).rev() {
        if live.ends_with(&SOURCES_HEADER[..len]) {
            return &live[..live.len() - len];
        }
    }
    live
}
