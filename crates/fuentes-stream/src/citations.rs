//! Splitting the final answer text into answer and cited sources
//!
//! The backend appends its sources to the generated answer as plain text:
//!
//! ```text
//! <answer>\n\nFuentes:\nFuente [1]: ...\nFuente [2]: ...
//! ```

use serde::{Deserialize, Serialize};

/// Header separating the answer from the sources block
pub const SOURCES_HEADER: &str = "\n\nFuentes:\n";

/// Marker that starts every source entry
pub const SOURCE_MARKER: &str = "Fuente [";

/// Separator between source entries
const SOURCE_SEPARATOR: &str = "\nFuente [";

/// An answer with its cited sources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Human-readable answer text
    pub content: String,
    /// Cited sources, in the order they appear
    pub sources: Vec<String>,
}

/// Split the final text into answer and sources.
///
/// Only the first sources header counts. Entries are separated by
/// `\nFuente [`, and every entry after the first gets that marker back.
/// The first entry follows the header directly, so its marker (if any) is
/// still in place and it is taken as-is. Empty entries are dropped and
/// duplicates are kept.
pub fn split_answer(full_text: &str) -> Answer {
    let Some((content, sources_text)) = full_text.split_once(SOURCES_HEADER) else {
        return Answer {
            content: full_text.to_string(),
            sources: Vec::new(),
        };
    };

    let sources = sources_text
        .split(SOURCE_SEPARATOR)
        .enumerate()
        .filter(|(_, fragment)| !fragment.is_empty())
        .map(|(i, fragment)| {
            // Every fragment after the first lost its marker to the split
            if i == 0 {
                fragment.to_string()
            } else {
                format!("{}{}", SOURCE_MARKER, fragment)
            }
        })
        .collect();

    Answer {
        content: content.to_string(),
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_header() {
        let answer = split_answer("Hello world");
        assert_eq!(answer.content, "Hello world");
        assert!(answer.sources.is_empty());
    }

    #[test]
    fn test_two_sources() {
        let answer = split_answer(
            "Answer text\n\nFuentes:\nFuente [1] doc.pdf p.2\nFuente [2] doc.pdf p.5",
        );
        assert_eq!(answer.content, "Answer text");
        assert_eq!(
            answer.sources,
            vec!["Fuente [1] doc.pdf p.2", "Fuente [2] doc.pdf p.5"]
        );
    }

    #[test]
    fn test_backend_source_format() {
        let text = "La ley establece...\n\nFuentes:\n\
                    Fuente [1]: leyes - ley.pdf, Página: 3, Fragmento: Artículo 1. El objeto...\n\
                    Fuente [2]: leyes - ley.pdf, Página: 7, Fragmento: Artículo 9. Los plazos...";
        let answer = split_answer(text);
        assert_eq!(answer.content, "La ley establece...");
        assert_eq!(answer.sources.len(), 2);
        assert!(answer.sources[0].starts_with("Fuente [1]: leyes"));
        assert!(answer.sources[1].starts_with("Fuente [2]: leyes"));
    }

    #[test]
    fn test_header_with_nothing_after() {
        let answer = split_answer("Only answer\n\nFuentes:\n");
        assert_eq!(answer.content, "Only answer");
        assert!(answer.sources.is_empty());
    }

    #[test]
    fn test_empty_fragments_dropped() {
        let answer = split_answer("A\n\nFuentes:\nFuente [1] x\nFuente [");
        assert_eq!(answer.sources, vec!["Fuente [1] x"]);
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        let answer = split_answer("A\n\nFuentes:\nFuente [1] x\nFuente [1] x\nFuente [0] y");
        assert_eq!(
            answer.sources,
            vec!["Fuente [1] x", "Fuente [1] x", "Fuente [0] y"]
        );
    }

    #[test]
    fn test_only_first_header_splits() {
        let answer = split_answer("A\n\nFuentes:\nFuente [1] x\n\nFuentes:\nFuente [2] y");
        assert_eq!(answer.content, "A");
        assert_eq!(answer.sources, vec!["Fuente [1] x\n\nFuentes:", "Fuente [2] y"]);
    }

    #[test]
    fn test_first_entry_never_gets_a_second_marker() {
        let answer = split_answer("A\n\nFuentes:\nFuente [1] x\nFuente [2] y");
        assert_eq!(answer.sources[0], "Fuente [1] x");

        // Text after the header without a marker is not given one
        let answer = split_answer("A\n\nFuentes:\nsin fuentes\nFuente [1] x");
        assert_eq!(answer.sources, vec!["sin fuentes", "Fuente [1] x"]);
    }

    #[test]
    fn test_multiline_source_entry() {
        let answer = split_answer("A\n\nFuentes:\nFuente [1] line one\nline two\nFuente [2] z");
        assert_eq!(
            answer.sources,
            vec!["Fuente [1] line one\nline two", "Fuente [2] z"]
        );
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(split_answer(""), Answer::default());
    }
}
