//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use sync_core::types::SignalVariant;

#[derive(Parser)]
#[command(name = "candle-sync")]
#[command(author, version, about = "Candle and ticker synchronization with offline recalculation")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level (overrides the configured level)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one OHLCV cycle and one ticker cycle
    Fetch(FetchArgs),
    /// Poll in real time until Ctrl-C
    Live(LiveArgs),
    /// Fetch once, then recalculate signals offline over a window
    Recalc(RecalcArgs),
    /// List or search the symbols of an exchange
    Symbols(SymbolsArgs),
    /// List available signal generators
    Signals,
    /// Validate configuration
    ValidateConfig,
}

/// Request parameters shared by the data commands. Unset values come from
/// the `[fetch]` and `[exchange]` configuration sections.
#[derive(clap::Args, Clone, Default)]
pub struct SourceArgs {
    /// Exchange adapter id (binance, csv, simulated)
    #[arg(short, long)]
    pub exchange: Option<String>,

    /// Symbol, BASE/QUOTE
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// Base granularity, e.g. 1h
    #[arg(short, long)]
    pub granularity: Option<String>,

    /// Closed candles to fetch (200-1000)
    #[arg(long)]
    pub limit: Option<u32>,

    /// Also fetch and analyze the next higher timeframe
    #[arg(long)]
    pub htf: bool,

    /// Closed HTF candles to fetch
    #[arg(long)]
    pub htf_limit: Option<u32>,

    /// Include the in-progress candle in signal input
    #[arg(long)]
    pub latest: bool,

    /// Signal generator variant (standard, smart_money)
    #[arg(long)]
    pub variant: Option<SignalVariant>,

    /// Serve candles from this CSV file through the `csv` adapter
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Window start (RFC 3339, YYYY-MM-DD[ HH:MM] or Unix ms)
    #[arg(long)]
    pub start: Option<String>,

    /// Window end
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(clap::Args)]
pub struct LiveArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Poll tickers only, over a single initial fetch
    #[arg(long)]
    pub backtest: bool,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    pub duration: Option<u64>,
}

#[derive(clap::Args)]
pub struct RecalcArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Window start (RFC 3339, YYYY-MM-DD[ HH:MM] or Unix ms)
    #[arg(long)]
    pub start: Option<String>,

    /// Window end
    #[arg(long)]
    pub end: Option<String>,

    /// Candles kept after filtering (1-1000)
    #[arg(long)]
    pub keep: Option<u32>,

    /// Signal variant of the recalculation (defaults to the fetch variant)
    #[arg(long)]
    pub recalc_variant: Option<SignalVariant>,

    /// Restore the initial and then the recent snapshot afterwards
    #[arg(long)]
    pub restore: bool,
}

#[derive(clap::Args)]
pub struct SymbolsArgs {
    /// Exchange adapter id
    #[arg(short, long)]
    pub exchange: Option<String>,

    /// Case-insensitive search term
    #[arg(long)]
    pub search: Option<String>,

    /// Maximum symbols to print
    #[arg(long, default_value = "50")]
    pub max: usize,
}
