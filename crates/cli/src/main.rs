//! IAMSage CLI
//!
//! Main entry point for the iamsage command-line tool.
//! Builds the IAM document index and answers questions grounded in it.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, BuildCommand, ChatCommand, SearchCommand, StatsCommand};
use iamsage_core::config::{AppConfig, ConfigOverrides};
use iamsage_core::logging::{self, LogFormat};
use iamsage_core::AppResult;
use std::path::PathBuf;

/// IAMSage - answers Identity and Access Management questions from your documents
#[derive(Parser, Debug)]
#[command(name = "iamsage")]
#[command(about = "Grounded answers over a corpus of IAM documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "IAMSAGE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "IAMSAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// LLM provider (gemini, ollama)
    #[arg(short, long, global = true, env = "IAMSAGE_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "IAMSAGE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the vector index from the raw documents
    Build(BuildCommand),

    /// Show the chunks nearest to a query
    Search(SearchCommand),

    /// Ask one question
    Ask(AskCommand),

    /// Ask questions interactively
    Chat(ChatCommand),

    /// Show index statistics
    Stats(StatsCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Build(_) => "build",
            Commands::Search(_) => "search",
            Commands::Ask(_) => "ask",
            Commands::Chat(_) => "chat",
            Commands::Stats(_) => "stats",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // The workspace and config flags decide which config file is read
    let workspace = cli.workspace.clone();
    let config_file = cli.config.clone();
    let config = AppConfig::load_with(|key| match key {
        "IAMSAGE_WORKSPACE" => workspace
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .or_else(|| std::env::var(key).ok()),
        "IAMSAGE_CONFIG" => config_file
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .or_else(|| std::env::var(key).ok()),
        _ => std::env::var(key).ok(),
    })?;

    // Apply CLI overrides
    let config = config.with_overrides(ConfigOverrides {
        workspace: cli.workspace,
        config_file: cli.config,
        provider: cli.provider,
        model: cli.model,
        log_level: cli.log_level,
        log_json: cli.log_json,
        verbose: cli.verbose,
        no_color: cli.no_color,
    });

    // Initialize logging with final configuration
    let format = if config.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    logging::init_logging(config.log_level.as_deref(), config.no_color, format)?;

    tracing::info!("IAMSage starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!(
        "Embedding: {}/{}; LLM: {}/{}",
        config.embedding.provider,
        config.embedding.model,
        config.llm.provider,
        config.llm.model
    );

    config.validate()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Build(cmd) => cmd.execute(config).await,
        Commands::Search(cmd) => cmd.execute(config).await,
        Commands::Ask(cmd) => cmd.execute(config).await,
        Commands::Chat(cmd) => cmd.execute(config).await,
        Commands::Stats(cmd) => cmd.execute(&config),
    };

    // Log completion
    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
