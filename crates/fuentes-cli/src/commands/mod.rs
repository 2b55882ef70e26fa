//! Slash commands for interactive mode

mod collections;

pub use collections::{CollectionsCommand, format_collections, parse_selection};

/// Result of executing a slash command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Fetch and show the backend's collections
    ListCollections,
    /// Replace the collection selection
    UseCollections(Vec<String>),
    /// Show a message to the user
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, selected: &[String]) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let (command, args) = match rest.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim()),
        None => (rest, ""),
    };
    let command = command.to_lowercase();

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "collections" | "cols" | "l" => CommandResult::ListCollections,

        "use" | "u" => CollectionsCommand::execute_use(args, selected),

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

pub fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?             Show this help message
  /collections, /cols, /l   List the backend's collections
  /use, /u [a,b,...]        Show or set the collections to search
  /quit, /exit, /q          Exit fuentes

Examples:
  /use leyes                Search only "leyes"
  /use leyes, normativa     Search both collections"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_command() {
        assert_eq!(execute_command("hola", &[]), None);
    }

    #[test]
    fn test_aliases() {
        assert_eq!(execute_command("/q", &[]), Some(CommandResult::Exit));
        assert_eq!(execute_command(" /EXIT ", &[]), Some(CommandResult::Exit));
        assert_eq!(
            execute_command("/cols", &[]),
            Some(CommandResult::ListCollections)
        );
        assert!(matches!(
            execute_command("/?", &[]),
            Some(CommandResult::Message(_))
        ));
    }

    #[test]
    fn test_use_with_args() {
        assert_eq!(
            execute_command("/use leyes,  normativa", &[]),
            Some(CommandResult::UseCollections(vec![
                "leyes".into(),
                "normativa".into()
            ]))
        );
    }

    #[test]
    fn test_unknown() {
        assert_eq!(
            execute_command("/model x", &[]),
            Some(CommandResult::Unknown("model".into()))
        );
    }
}
