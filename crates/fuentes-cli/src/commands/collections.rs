//! /use and /collections - choose and list searchable collections

use super::CommandResult;
use fuentes_stream::CollectionInfo;

pub struct CollectionsCommand;

impl CollectionsCommand {
    /// Execute /use - shows the selection without args, replaces it otherwise
    pub fn execute_use(args: &str, selected: &[String]) -> CommandResult {
        if args.is_empty() {
            return CommandResult::Message(if selected.is_empty() {
                "No collections selected.\nSelect with: /use <name>[,<name>...]".to_string()
            } else {
                format!("Searching: {}", selected.join(", "))
            });
        }
        CommandResult::UseCollections(parse_selection(args))
    }
}

/// Split a comma- or space-separated list, dropping blanks and repeats
pub fn parse_selection(args: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in args.split(|c: char| c == ',' || c.is_whitespace()) {
        let name = name.trim();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Format the backend's collections, marking the selected ones
pub fn format_collections(collections: &[CollectionInfo], selected: &[String]) -> String {
    if collections.is_empty() {
        return "The backend has no collections".to_string();
    }

    let name_width = collections
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0);

    let mut output = String::from("Available collections:\n");
    for info in collections {
        let marker = if selected.contains(&info.name) { "*" } else { " " };
        let status = if info.is_active() { "active" } else { "error" };
        output.push_str(&format!(
            "\n {} {:<width$}  {:>8} vectors  {}",
            marker,
            info.name,
            info.vectors_count,
            status,
            width = name_width
        ));
    }
    output.push_str("\n\nSelect with: /use <name>[,<name>...]");
    output
}
