//! CLI module for Relay
//!
//! Command-line interface definitions and handlers for the Relay gateway.
//!
//! # Commands
//!
//! - `serve` - Start the Relay server
//! - `stats` - Show hourly telemetry rollups from the durable store
//! - `recent` - Show the most recent request records
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Start server with default config
//! relay serve
//!
//! # Last 6 hours of rollups as JSON
//! relay stats --hours 6 --json
//!
//! # Generate shell completions
//! relay completions bash > ~/.bash_completion.d/relay
//! ```

pub mod completions;
pub mod config;
pub mod output;
pub mod serve;
pub mod stats;

pub use completions::handle_completions;
pub use config::handle_config_init;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Relay - resilient query dispatch gateway
#[derive(Parser, Debug)]
#[command(
    name = "relay",
    version,
    about = "Query-forwarding gateway with circuit breaking, retries and telemetry"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the Relay server
    Serve(ServeArgs),
    /// Show hourly request statistics
    Stats(StatsArgs),
    /// Show recent requests
    Recent(RecentArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "RELAY_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "RELAY_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RELAY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Disable the circuit breaker
    #[arg(long)]
    pub no_circuit_breaker: bool,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Number of hours to show, newest first
    #[arg(long, default_value = "24")]
    pub hours: u32,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct RecentArgs {
    /// Maximum number of records
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,

    /// Filter by status (ok, degraded, error)
    #[arg(short, long)]
    pub status: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "relay.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
