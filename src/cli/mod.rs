//! `sharpline` command line.
//!
//! Every command reads local input (flags or a JSON file) and prints either
//! tables or, with `--json`, the full structured result.

pub mod output;
pub mod pricing;
pub mod scan;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::domain::OddsFormat;
use output::OutputMode;

#[derive(Parser, Debug)]
#[command(name = "sharpline")]
#[command(version)]
#[command(
    about = "Sportsbook odds normalization, de-vig, EV and parlay analysis",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Output as JSON instead of human-readable tables.
    #[arg(long, global = true)]
    pub json: bool,

    /// Config directory (default.toml + $SHARPLINE_ENV overrides).
    #[arg(long, global = true, env = "SHARPLINE_CONFIG_DIR", default_value = "config")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Convert a price between American and decimal odds.
    Convert {
        #[arg(long, allow_hyphen_values = true)]
        odds: String,
        #[arg(long, default_value = "american")]
        format: OddsFormat,
    },
    /// Strip the vig from one book's American prices for a market.
    Devig {
        #[arg(required = true, allow_hyphen_values = true)]
        prices: Vec<String>,
    },
    /// Price a single outcome against a true probability.
    Ev {
        #[arg(long, allow_hyphen_values = true)]
        odds: String,
        #[arg(long, default_value = "american")]
        format: OddsFormat,
        /// True (fair) win probability, e.g. 0.52
        #[arg(long)]
        probability: Decimal,
    },
    /// Analyse a market submission (or a JSON array of them).
    Market {
        #[arg(long)]
        file: PathBuf,
    },
    /// Analyse a parlay, or compare a JSON array of parlays.
    Parlay {
        #[arg(long)]
        file: PathBuf,
        /// Override the stake of every parlay in the file
        #[arg(long)]
        stake: Option<Decimal>,
    },
    /// Rank positive-EV bets in an odds snapshot and assemble a parlay.
    Scan(scan::ScanArgs),
}

/// Load configuration, falling back to defaults when nothing is on disk.
pub fn load_config(global: &GlobalArgs) -> anyhow::Result<AppConfig> {
    let config = AppConfig::load_from(&global.config)?;
    if let Err(errors) = config.validate() {
        anyhow::bail!("invalid configuration: {}", errors.join("; "));
    }
    Ok(config)
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let mode = OutputMode::from_json_flag(cli.global.json);

    match cli.command {
        Commands::Convert { odds, format } => pricing::convert(&odds, format, mode),
        Commands::Devig { prices } => pricing::devig(&prices, mode),
        Commands::Ev {
            odds,
            format,
            probability,
        } => pricing::ev(&odds, format, probability, mode),
        Commands::Market { file } => {
            let config = load_config(&cli.global)?;
            pricing::market(&file, &config, mode)
        }
        Commands::Parlay { file, stake } => pricing::parlay(&file, stake, mode),
        Commands::Scan(args) => {
            let config = load_config(&cli.global)?;
            scan::run(args, &config, mode)
        }
    }
}
