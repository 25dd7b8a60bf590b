//! Thin manual-testing entry point (spec §2 Supplementary): wires a
//! [`GatewayConfig`] into the full component graph and drives exactly one
//! Agent Loop turn against stdin/stdout.
//!
//! This is not a channel adapter in the sense of the Non-goals (§1 excludes
//! "channel adapters (CLI REPL, Slack, Telegram, etc.)" and "terminal
//! rendering" as products in their own right) — it has no persistent REPL
//! loop, no rendering beyond printing the reply, and exists only so the
//! gateway can be exercised without a real channel integration.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;

use clawpoint::agent::{AgentLoop, Chunk};
use clawpoint::config::{self, GatewayConfig};
use clawpoint::context_guard::ContextWindow;
use clawpoint::event_bus::EventBus;
use clawpoint::identity::IdentityLoader;
use clawpoint::memory::{DailyMemory, MemoryController};
use clawpoint::provider::{FallbackRouter, ModelRouter, ModelTarget, OpenAiCompatibleProvider, ProviderRegistry, RouterConfig};
use clawpoint::session::{InboundContext, SessionManager, SessionStore, SqliteSessionStore};
use clawpoint::tools::ToolRegistry;

#[derive(Parser)]
#[command(name = "clawpoint", about = "Personal AI assistant gateway — single-turn manual test harness")]
struct Args {
    /// Path to config.toml. Defaults to ~/.clawpoint/config.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Message text. When omitted, the whole of stdin is read as the message.
    #[arg(long)]
    message: Option<String>,

    /// Sender id used to resolve/create the session (spec §4.2).
    #[arg(long, default_value = "cli-user")]
    sender: String,

    /// Channel name the session is indexed under.
    #[arg(long, default_value = "cli")]
    channel: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::load_config(path).unwrap_or_else(|err| {
            eprintln!("failed to load {}: {err}, falling back to defaults", path.display());
            GatewayConfig::default()
        }),
        None => config::load_default_config(),
    };

    let message = match args.message {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            if let Err(err) = io::stdin().read_to_string(&mut buf) {
                eprintln!("failed to read stdin: {err}");
                std::process::exit(1);
            }
            buf
        }
    };
    if message.trim().is_empty() {
        eprintln!("no message given (pass --message or pipe text to stdin)");
        std::process::exit(1);
    }

    let bus = Arc::new(EventBus::new());

    let session_db = clawpoint::config::default_config_path()
        .ok()
        .and_then(|p| p.parent().map(|d| d.join("sessions.sqlite3")))
        .unwrap_or_else(|| PathBuf::from("sessions.sqlite3"));
    let store: Arc<dyn SessionStore> = match SqliteSessionStore::open(&session_db) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            eprintln!("failed to open session store at {}: {err}", session_db.display());
            std::process::exit(1);
        }
    };
    let idle_timeout = Duration::from_secs(config.memory.session.idle_timeout_secs);
    let sessions = SessionManager::new(store, Arc::clone(&bus), idle_timeout);

    let mut registry = ProviderRegistry::new();
    for (id, entry) in &config.providers {
        let provider = OpenAiCompatibleProvider::new(id.clone(), entry.base_url.clone(), entry.api_key.clone(), entry.models.clone());
        registry.register(Arc::new(provider));
    }
    let providers = Arc::new(registry);
    if providers.is_empty() {
        eprintln!(
            "warning: no LLM provider configured; edit {}",
            config::default_config_path().map(|p| p.display().to_string()).unwrap_or_else(|_| "~/.clawpoint/config.toml".into())
        );
    }

    let default_target = config.failover.first().map(|provider_id| ModelTarget { provider_id: provider_id.clone(), model: config.default_model.clone() });
    let router_config = RouterConfig {
        cost_rank: config.routing.cost_rank.clone(),
        quality_rank: config.routing.quality_rank.clone(),
        cheap_hints: config.routing.cheap_hints.clone(),
        reasoning_hints: config.routing.reasoning_hints.clone(),
        default_target,
    };
    let model_router = Arc::new(ModelRouter::new(router_config));
    let fallback = Arc::new(FallbackRouter::default());

    let identity_dir = clawpoint::config::default_config_path().ok().and_then(|p| p.parent().map(|d| d.join("identity"))).unwrap_or_else(|| PathBuf::from(".clawpoint/identity"));
    let identity = match IdentityLoader::new(identity_dir) {
        Ok(identity) => identity,
        Err(err) => {
            eprintln!("failed to load identity documents: {err}");
            std::process::exit(1);
        }
    };
    let memory_dir = clawpoint::config::default_config_path().ok().and_then(|p| p.parent().map(|d| d.join("memory"))).unwrap_or_else(|| PathBuf::from(".clawpoint/memory"));
    let daily = DailyMemory::new(memory_dir);
    let memory = Arc::new(
        MemoryController::new(identity, daily)
            .with_keep_recent(config.memory.compaction.keep_recent_messages),
    );

    let tools = Arc::new(ToolRegistry::new());

    let context_window = ContextWindow::new(config.max_tokens);
    let agent = AgentLoop::new(Arc::clone(&sessions), memory, tools, providers, model_router, fallback, Arc::clone(&bus), context_window)
        .with_max_iterations(config.max_iterations);

    let inbound = InboundContext::dm(args.channel.clone(), args.sender.clone());
    let session = sessions.resolve(&inbound);
    sessions.activate(&session.id);
    if let Err(err) = sessions.append_message(&session.id, clawpoint::model::Message::user(message)) {
        eprintln!("failed to append inbound message: {err}");
        std::process::exit(1);
    }

    let turn_lock = sessions.turn_lock(&session.id);
    let _guard = turn_lock.lock().await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let run = agent.run_turn(&session.id, tx);
    let drain = async {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        while let Some(chunk) = rx.recv().await {
            match chunk {
                Chunk::Thinking { .. } => {}
                Chunk::Text { content } => {
                    let _ = write!(handle, "{content}");
                }
                Chunk::ToolCall { name, .. } => {
                    eprintln!("[calling tool: {name}]");
                }
                Chunk::ToolResult { success, .. } => {
                    eprintln!("[tool result: {}]", if success { "ok" } else { "error" });
                }
                Chunk::Error { content } => {
                    eprintln!("error: {content}");
                }
                Chunk::Done { .. } => {
                    let _ = writeln!(handle);
                }
            }
        }
    };
    tokio::join!(run, drain);

    sessions.idle(&session.id);
    sessions.persist_all();
}
