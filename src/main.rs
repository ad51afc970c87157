use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pushgate::config::Config;
use pushgate::{mcp, repl};

#[derive(Parser)]
#[command(name = "pushgate")]
#[command(about = "Reviewed git pushes for AI agents")]
#[command(version)]
struct Cli {
    /// Path to the repository (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Path to the config file (defaults to .pushgate/config.toml in repo root)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run as a stdio MCP server, forwarding tool calls to the interactive
    /// process over the loopback bridge
    Mcp,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Stdout is the stdio MCP channel in `pushgate mcp`; logs always go to
    // stderr so both roles can share this setup.
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let work_dir = cli.path.unwrap_or_else(|| PathBuf::from("."));

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_dir(&work_dir)?,
    };

    match cli.command {
        Some(Commands::Mcp) => mcp::stdio::run(config).await,
        None => repl::run_in(&work_dir, config).await,
    }
}
