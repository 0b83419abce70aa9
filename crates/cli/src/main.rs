mod config;
mod error;
mod repl;

use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use mcp::ServerConfig;
use runtime::{AnthropicBackend, McpToolHost, Session};
use storage::{Event, EventKind, EventStore, Role};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const DATA_DIR_NAME: &str = "tether";
const MAX_CONTENT_DISPLAY: usize = 200;

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Let Claude call the tools of a local MCP server", long_about = None)]
#[command(version, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Tool server script (.js or .py)
    server: Option<PathBuf>,

    /// Config file (defaults to ./tether.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured model
    #[arg(short, long)]
    model: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List recorded sessions
    Sessions {
        /// Show only the last N sessions
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show event logs for a session
    Logs {
        /// Session ID (prefix match supported)
        #[arg(short, long)]
        session: String,
        /// Filter by event kind (message, tool_call, tool_result, fallback)
        #[arg(short, long)]
        kind: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to load .env: {e}");
        }
    }

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(cli: Cli) -> Result<()> {
    match (cli.command, cli.server) {
        (Some(Commands::Sessions { limit }), _) => cmd_sessions(limit),
        (Some(Commands::Logs { session, kind }), _) => cmd_logs(&session, kind.as_deref()),
        (None, Some(server)) => cmd_connect(&server, cli.config.as_deref(), cli.model).await,
        (None, None) => {
            println!("Usage: tether <path_to_server_script>");
            Ok(())
        }
    }
}

async fn cmd_connect(
    script: &Path,
    config_path: Option<&Path>,
    model: Option<String>,
) -> Result<()> {
    let config = Config::discover(config_path)?;
    let api_key = config.api_key()?;
    let model = model.unwrap_or_else(|| config.backend.model.clone());

    let mut builder = AnthropicBackend::builder(api_key, &model)
        .max_tokens(config.backend.max_tokens)
        .base_url(&config.backend.base_url);
    if let Some(system) = &config.backend.system {
        builder = builder.system(system);
    }
    let backend = builder.build();
    info!(model = backend.model(), "model backend ready");

    let server_config = ServerConfig::for_script(script)?.with_timeout(config.server.timeout());
    let host = McpToolHost::connect(server_config).await?;

    let session = Session::start(backend, host)
        .await?
        .with_fallback(config.session.fallback());
    let mut session = if config.session.record {
        let store = create_store()?;
        session.with_store(store, script.display().to_string())?
    } else {
        session
    };
    info!(session = %session.id, "ready");

    println!(
        "\nConnected to server with tools: {:?}",
        session.registry().names()
    );
    println!("\nMCP Client Started!");
    println!("Type your queries or 'quit' to exit.");

    let result = repl::run(&mut session, io::stdin().lock(), io::stdout()).await;

    let host = session.end()?;
    host.shutdown().await?;
    result
}

fn cmd_sessions(limit: usize) -> Result<()> {
    let store = open_store()?;
    let sessions = store.list_sessions()?;

    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<20}  {:<8}  STATUS",
        "SESSION ID", "STARTED", "QUERIES"
    );
    println!("{}", "-".repeat(80));

    for summary in sessions.into_iter().take(limit) {
        let started = Local
            .from_utc_datetime(&summary.started_at.naive_utc())
            .format("%Y-%m-%d %H:%M");
        let status = if summary.ended_at.is_some() {
            "ended"
        } else {
            "active"
        };
        println!(
            "{:<36}  {:<20}  {:<8}  {status}",
            summary.id, started, summary.query_count
        );
    }

    Ok(())
}

fn cmd_logs(session_prefix: &str, kind_filter: Option<&str>) -> Result<()> {
    let store = open_store()?;

    let sessions = store.list_sessions()?;
    let matching: Vec<_> = sessions
        .iter()
        .filter(|s| s.id.to_string().starts_with(session_prefix))
        .collect();

    let session_id = match matching.as_slice() {
        [] => {
            return Err(Error::SessionNotFound {
                prefix: session_prefix.to_string(),
            });
        }
        [only] => only.id,
        _ => {
            return Err(Error::AmbiguousSession {
                prefix: session_prefix.to_string(),
                matches: matching.iter().map(|s| s.id.to_string()).collect(),
            });
        }
    };

    let events = store.load_events(session_id, kind_filter)?;

    if events.is_empty() {
        println!("No events found for session {session_id}");
        return Ok(());
    }

    println!("Session: {session_id}\n");

    for event in events {
        println!("{}", format_event(&event));
    }

    Ok(())
}

fn format_event(event: &Event) -> String {
    let time = Local
        .from_utc_datetime(&event.timestamp.naive_utc())
        .format("%H:%M:%S");

    match &event.kind {
        EventKind::SessionStart { server } => {
            format!("[{time}] === Session started ({server}) ===")
        }
        EventKind::SessionEnd => format!("[{time}] === Session ended ==="),
        EventKind::Message { role, content } => {
            let role = match role {
                Role::User => "USER",
                Role::Assistant => "ASSISTANT",
            };
            format!("[{time}] {role}: {}", truncate(content))
        }
        EventKind::ToolCall { name, input } => {
            format!("[{time}] TOOL CALL: {name} {input}")
        }
        EventKind::ToolResult {
            name,
            output,
            is_error,
        } => {
            let label = if *is_error { "TOOL ERROR" } else { "TOOL RESULT" };
            format!("[{time}] {label}: {name} {}", truncate(output))
        }
        EventKind::Fallback { name, output } => {
            format!("[{time}] FALLBACK: {name} {}", truncate(output))
        }
    }
}

fn truncate(content: &str) -> String {
    match content.char_indices().nth(MAX_CONTENT_DISPLAY) {
        Some((end, _)) => format!("{}...", &content[..end]),
        None => content.to_string(),
    }
}

fn db_path() -> PathBuf {
    data_dir()
        .unwrap_or_else(|| PathBuf::from(".tether"))
        .join("events.db")
}

fn create_store() -> Result<EventStore> {
    let path = db_path();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    info!(path = %path.display(), "recording session");
    Ok(EventStore::open(&path)?)
}

fn open_store() -> Result<EventStore> {
    let path = db_path();
    if !path.exists() {
        return Err(Error::DatabaseNotFound { path });
    }
    Ok(EventStore::open(&path)?)
}

fn data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share").join(DATA_DIR_NAME))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join(DATA_DIR_NAME))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join(DATA_DIR_NAME))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}
