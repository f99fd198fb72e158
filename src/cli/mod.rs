//! Command-line interface definitions.
//!
//! Defines the CLI structure for the voidwatch binary using `clap`. The
//! CLI supports running the intelligence daemon in the foreground, one-shot
//! arbitrage scans and statistics queries over a deterministic demo
//! universe, cache maintenance, and diagnostic checks.

pub mod banner;
pub mod cache;
pub mod check;
pub mod demo;
pub mod output;
pub mod run;
pub mod scan;
pub mod stats;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::application::InvalidationReason;
use crate::config::Config;
use crate::domain::RiskLevel;
use crate::error::Result;

/// Market-intelligence core for a space-trading companion.
#[derive(Parser, Debug)]
#[command(name = "voidwatch")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the voidwatch CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the intelligence daemon (foreground, interactive)
    Run(RunArgs),

    /// Scan trade routes for arbitrage opportunities
    Scan(ScanArgs),

    /// Compute market statistics for one item and region
    Stats(StatsArgs),

    /// Inspect and maintain the snapshot cache
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Skip ASCII art banner
    #[arg(long)]
    pub no_banner: bool,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override the refresh tick interval in seconds
    #[arg(long)]
    pub tick_secs: Option<u64>,
}

/// Arguments for the `scan` subcommand.
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Minimum profit margin, e.g. 0.05 for 5%
    #[arg(long)]
    pub min_margin: Option<Decimal>,

    /// Risk ceiling (minimal, low, moderate, elevated, high)
    #[arg(long)]
    pub max_risk: Option<RiskLevel>,

    /// Restrict the scan to one market category subtree
    #[arg(long)]
    pub category: Option<u32>,

    /// Show the top items for one route id instead of the full scan
    #[arg(long)]
    pub route: Option<u32>,

    /// How many items to list with --route
    #[arg(long)]
    pub top: Option<usize>,
}

/// Arguments for the `stats` subcommand.
#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Item type id
    #[arg(long, default_value = "34")]
    pub type_id: u32,

    /// Region id
    #[arg(long, default_value = "10000002")]
    pub region: u32,

    /// Trailing window length in days
    #[arg(long)]
    pub days: Option<u32>,

    /// Write the computed statistics through to the snapshot cache
    #[arg(long)]
    pub cache: bool,
}

/// Subcommands for `voidwatch cache`.
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show cached entries, their freshness, and store metrics
    Status,
    /// Remove expired entries below Critical priority
    Cleanup,
    /// Evict disposable entries until the size budget is met
    Evict(EvictArgs),
    /// Drop one entry from the cache by key
    Invalidate(InvalidateArgs),
    /// Show recent invalidation events
    Log,
}

/// Arguments for `cache evict`.
#[derive(Parser, Debug)]
pub struct EvictArgs {
    /// Byte budget to evict down to (defaults to the configured budget)
    #[arg(long)]
    pub max_bytes: Option<u64>,
}

/// Arguments for `cache invalidate`.
#[derive(Parser, Debug)]
pub struct InvalidateArgs {
    /// Cache key to drop, e.g. "orders:10000002:34:*"
    pub key: String,

    /// Why the entry is being dropped
    #[arg(long, default_value = "manual")]
    pub reason: InvalidationReason,
}

/// Subcommands for `voidwatch check`.
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate the configuration file syntax and semantics
    Config,
    /// Validate the category hierarchy and cache integrity
    Data,
}

/// Dispatch a parsed CLI invocation.
pub async fn execute(cli: Cli) -> Result<()> {
    // `check config` reports load failures itself instead of dying on them.
    if let Commands::Check(CheckCommand::Config) = &cli.command {
        return check::config_report(cli.config.as_deref());
    }

    let config = Config::load_or_default(cli.config.as_deref())?;
    match cli.command {
        Commands::Run(args) => run::execute(&config, &args).await,
        Commands::Scan(args) => scan::execute(&config, &args),
        Commands::Stats(args) => stats::execute(&config, &args).await,
        Commands::Cache(command) => cache::execute(&config, &command).await,
        Commands::Check(_) => check::data_report(&config).await,
    }
}
