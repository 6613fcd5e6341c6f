//! Syllabus CLI
//!
//! Main entry point for the syllabus command-line tool.
//! Indexes course materials and answers questions about them.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, CoursesCommand, IngestCommand, OutlineCommand};
use std::path::PathBuf;
use syllabus_core::{
    config::AppConfig,
    logging::{self, LogFormat},
    AppResult,
};

/// Syllabus - question answering over course materials
#[derive(Parser, Debug)]
#[command(name = "syllabus")]
#[command(about = "Question answering over course materials", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "SYLLABUS_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "SYLLABUS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Generation provider (ollama, claude)
    #[arg(short, long, global = true, env = "SYLLABUS_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "SYLLABUS_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index course documents
    Ingest(IngestCommand),

    /// Ask one question about the course materials
    Ask(AskCommand),

    /// Interactive conversation about the course materials
    Chat(ChatCommand),

    /// List indexed courses
    Courses(CoursesCommand),

    /// Show a course outline
    Outline(OutlineCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(
        config.log_level.as_deref(),
        config.no_color,
        LogFormat::parse(&config.log_format),
    )?;

    tracing::info!("Syllabus CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.validate()?;
    config.ensure_syllabus_dir()?;

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Courses(_) => "courses",
        Commands::Outline(_) => "outline",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Courses(cmd) => cmd.execute(&config).await,
        Commands::Outline(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
