//! mnemo CLI - hybrid memory engine
//!
//! One binary over the tri-store: ingest content, query it, keep it
//! consolidated, index repositories, and schedule recurring agents.
//!
//! # Usage
//!
//! ```bash
//! # Add and query
//! mnemo memory add "Paris is the capital of France" -m type=fact
//! mnemo memory query "capital of France" -l 3
//!
//! # Keep memory healthy
//! mnemo memory consolidate
//!
//! # Index a repository incrementally
//! mnemo code-index acme/widget -c opensource
//!
//! # Schedule nightly consolidation
//! mnemo schedule add consolidator -c "0 3 * * *"
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod scheduler;
mod state;

use commands::App;
use state::StateDir;

/// mnemo - hybrid memory over vector, graph and cache stores
#[derive(Parser, Debug)]
#[command(name = "mnemo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// State and config directory (default ~/.mnemo)
    #[arg(long, global = true, env = "MNEMO_HOME")]
    home: Option<PathBuf>,

    /// Use in-memory backends; nothing persists across invocations
    #[arg(long, global = true)]
    offline: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Qdrant server URL
    #[arg(long, global = true, env = "MNEMO_QDRANT_URL")]
    qdrant_url: Option<String>,

    /// FalkorDB server URL
    #[arg(long, global = true, env = "MNEMO_FALKORDB_URL")]
    falkordb_url: Option<String>,

    /// Redis server URL
    #[arg(long, global = true, env = "MNEMO_REDIS_URL")]
    redis_url: Option<String>,

    /// Embedding provider (openai, deterministic)
    #[arg(long, global = true, env = "MNEMO_EMBEDDING_PROVIDER", value_parser = parse_embedding_provider)]
    embedding_provider: Option<mnemo_config::EmbeddingProviderType>,
}

fn parse_embedding_provider(s: &str) -> Result<mnemo_config::EmbeddingProviderType, String> {
    s.parse()
        .map_err(|e: mnemo_config::ConfigError| e.to_string())
}

impl GlobalOptions {
    fn to_config_overrides(&self) -> mnemo_config::ConfigOverrides {
        mnemo_config::ConfigOverrides {
            vector_url: self.qdrant_url.clone(),
            graph_url: self.falkordb_url.clone(),
            cache_url: self.redis_url.clone(),
            embedding_provider: self.embedding_provider,
            log_level: None,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add, query, analyze and consolidate memory
    #[command(subcommand)]
    Memory(commands::memory::MemoryCommand),

    /// Run and manage agents
    #[command(subcommand)]
    Agent(commands::agent::AgentCommand),

    /// Index a GitHub repository into memory
    CodeIndex(commands::code_index::CodeIndexArgs),

    /// Manage scheduled tasks
    #[command(subcommand)]
    Schedule(commands::schedule::ScheduleCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.global.quiet {
        "error"
    } else if cli.global.verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut loader = match cli.global.home {
        Some(ref home) => mnemo_config::ConfigLoader::with_global_dir(home),
        None => mnemo_config::ConfigLoader::new(),
    };

    let workdir = std::env::current_dir().context("resolving working directory")?;
    let overrides = cli.global.to_config_overrides();
    let config = loader.load(&workdir, Some(&overrides))?;

    let state_root = loader
        .global_dir()
        .map(|d| d.to_path_buf())
        .context("could not determine the state directory; set MNEMO_HOME")?;
    let state = StateDir::new(state_root);
    state.ensure_layout()?;

    let app = App {
        config,
        state,
        offline: cli.global.offline,
    };

    match cli.command {
        Commands::Memory(command) => commands::memory::run(&app, command).await,
        Commands::Agent(command) => commands::agent::run(&app, command).await,
        Commands::CodeIndex(args) => commands::code_index::run(&app, args).await,
        Commands::Schedule(command) => commands::schedule::run(&app, command).await,
    }
}
