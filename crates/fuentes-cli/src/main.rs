//! fuentes - ask questions over document collections and read cited answers

mod commands;
mod config;
mod printer;
mod ui;
mod utils;

use clap::Parser;
use fuentes_chat::{Chat, ChatConfig, ChatEvent, SubmitOutcome};
use fuentes_stream::{DEFAULT_BASE_URL, HttpBackend};
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::commands::{CommandResult, execute_command, format_collections, parse_selection};
use crate::printer::StreamPrinter;

/// Connect timeout used when the config does not set one
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// fuentes - answers with cited sources from your document collections
#[derive(Parser, Debug)]
#[command(name = "fuentes")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend URL (default: http://localhost:8000)
    #[arg(short, long)]
    url: Option<String>,

    /// Collection to search; repeat or separate with commas
    #[arg(short = 'C', long = "collection")]
    collections: Vec<String>,

    /// Ask a single question and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// List the backend's collections and exit
    #[arg(short, long)]
    list_collections: bool,

    /// Print results as JSON (with --command or --list-collections)
    #[arg(long)]
    json: bool,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long)]
    no_tui: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fuentes=debug"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }

    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    // CLI takes precedence over the config file
    let backend_url = args
        .url
        .clone()
        .or(cfg.backend_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let timeout = Duration::from_secs(cfg.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
    let collections = if args.collections.is_empty() {
        cfg.collections.clone()
    } else {
        parse_selection(&args.collections.join(","))
    };

    let backend = match HttpBackend::with_connect_timeout(&backend_url, timeout) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!("Using backend at {}", backend.base_url());

    let mut chat_config = ChatConfig::default();
    if let Some(message) = cfg.error_message.clone() {
        chat_config.error_message = message;
    }
    let chat = Chat::new(chat_config, Arc::new(backend));

    if args.list_collections {
        return list_collections(&chat, &collections, args.json).await;
    }

    if let Some(command) = args.command {
        return run_command(&chat, &command, &collections, args.json).await;
    }

    let use_tui = !args.no_tui && cfg.tui.unwrap_or(true) && io::stdout().is_terminal();
    if use_tui {
        let theme = fuentes_tui::Theme::by_name(cfg.theme.as_deref().unwrap_or("dark"));
        return ui::run_tui(&chat, collections, backend_url, theme).await;
    }

    run_interactive(&chat, collections, &backend_url).await
}

async fn list_collections(chat: &Chat, selected: &[String], json: bool) -> anyhow::Result<()> {
    match chat.list_collections().await {
        Ok(list) if json => println!("{}", serde_json::to_string_pretty(&list)?),
        Ok(list) => println!("{}", format_collections(&list, selected)),
        Err(e) => {
            eprintln!("Error listing collections: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Submit one query, printing the answer as it streams unless `quiet`.
///
/// Ctrl+C aborts the query; the chat then records it as cancelled.
async fn stream_query(
    chat: &Chat,
    query: &str,
    collections: &[String],
    quiet: bool,
) -> anyhow::Result<SubmitOutcome> {
    let mut receiver = chat.subscribe();
    let mut printer = StreamPrinter::new();
    let mut submit = std::pin::pin!(chat.submit(query, collections));

    let show = |event: ChatEvent, printer: &mut StreamPrinter| {
        if let ChatEvent::Error { message, .. } = &event {
            tracing::debug!("Query failed: {}", message);
        }
        if quiet {
            return;
        }
        if let Some(text) = printer.on_event(&event) {
            print!("{}", text);
            io::stdout().flush().ok();
        }
    };

    let outcome = loop {
        tokio::select! {
            biased;

            event = receiver.recv() => {
                if let Ok(event) = event {
                    show(event, &mut printer);
                }
            }

            result = &mut submit => break result?,

            _ = tokio::signal::ctrl_c() => chat.abort(),
        }
    };

    while let Ok(event) = receiver.try_recv() {
        show(event, &mut printer);
    }

    Ok(outcome)
}

async fn run_command(
    chat: &Chat,
    command: &str,
    collections: &[String],
    json: bool,
) -> anyhow::Result<()> {
    if collections.is_empty() {
        eprintln!("Error: no collections selected");
        eprintln!();
        eprintln!("Pass one with: fuentes -C <name> -c \"<question>\"");
        eprintln!("See what the backend offers with: fuentes --list-collections");
        std::process::exit(2);
    }

    let outcome = stream_query(chat, command, collections, json).await?;

    if json {
        if let Some(message) = chat.messages().last() {
            println!("{}", serde_json::to_string_pretty(message)?);
        }
    }

    match outcome {
        SubmitOutcome::Completed => Ok(()),
        SubmitOutcome::Rejected => {
            eprintln!("Error: empty question");
            std::process::exit(2);
        }
        SubmitOutcome::Failed | SubmitOutcome::Cancelled => std::process::exit(1),
    }
}

async fn run_interactive(
    chat: &Chat,
    mut collections: Vec<String>,
    backend_url: &str,
) -> anyhow::Result<()> {
    // Show minimal startup info (only if TTY)
    if io::stderr().is_terminal() {
        if collections.is_empty() {
            eprintln!("fuentes ({}) no collections selected, try /collections", backend_url);
        } else {
            eprintln!("fuentes ({}) searching: {}", backend_url, collections.join(", "));
        }
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) = execute_command(input, &collections) {
            match result {
                CommandResult::Message(msg) => println!("{}", msg),
                CommandResult::ListCollections => match chat.list_collections().await {
                    Ok(list) => println!("{}", format_collections(&list, &collections)),
                    Err(e) => println!("Failed to list collections: {}", e),
                },
                CommandResult::UseCollections(names) => {
                    println!("Searching: {}", names.join(", "));
                    collections = names;
                }
                CommandResult::Exit => break,
                CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            println!();
            continue;
        }

        if collections.is_empty() {
            println!("Select at least one collection first: /use <name>[,<name>...]");
            println!();
            continue;
        }

        println!();
        if let Err(e) = stream_query(chat, input, &collections, false).await {
            eprintln!("Error: {}", e);
        }
        println!();
    }

    Ok(())
}
