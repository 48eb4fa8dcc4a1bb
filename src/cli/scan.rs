//! `sharpline scan` — rank positive-EV bets in an odds snapshot.

use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

use super::output::{self, american, num, pct, OutputMode};
use super::pricing::ParlaySummaryRow;
use crate::config::AppConfig;
use crate::domain::parse_snapshot;
use crate::finder::{Bet, BetFilters, FinderOptions, ParlayOptions, PositiveEvFinder, ScanOptions};

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Odds snapshot: an array of games or `{ "games": [...] }`
    #[arg(long)]
    pub file: PathBuf,
    /// Minimum EV per unit (overrides finder.min_ev)
    #[arg(long, allow_hyphen_values = true)]
    pub min_ev: Option<Decimal>,
    #[arg(long)]
    pub max_bets: Option<usize>,
    /// Drop bets without a baseline match
    #[arg(long)]
    pub require_baseline: bool,
    /// Parlay legs to assemble (0 skips parlay assembly)
    #[arg(long)]
    pub legs: Option<usize>,
    /// Fill the parlay with player props first
    #[arg(long)]
    pub props: bool,
    #[arg(long)]
    pub props_ratio: Option<Decimal>,
    #[arg(long, value_delimiter = ',')]
    pub sports: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub markets: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub books: Vec<String>,
}

impl ScanArgs {
    /// Merge flags over configured defaults
    pub fn options(&self, config: &AppConfig) -> ScanOptions {
        let mut finder = FinderOptions::from(&config.finder);
        if let Some(min_ev) = self.min_ev {
            finder.min_ev = min_ev;
        }
        if let Some(max_bets) = self.max_bets {
            finder.max_bets = max_bets;
        }
        finder.require_baseline |= self.require_baseline;
        finder.filters = BetFilters {
            sports: self.sports.clone(),
            markets: self.markets.clone(),
            books: self.books.clone(),
        };

        let mut parlay = ParlayOptions::from(&config.parlay);
        if let Some(legs) = self.legs {
            parlay.legs = legs;
        }
        parlay.require_player_props |= self.props;
        if let Some(ratio) = self.props_ratio {
            parlay.player_props_ratio = ratio;
        }

        ScanOptions {
            finder,
            parlay: (parlay.legs > 0).then_some(parlay),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct BetRow {
    game: String,
    market: String,
    selection: String,
    book: String,
    odds: String,
    #[tabled(rename = "true")]
    true_probability: String,
    ev: String,
    confidence: String,
    source: String,
}

impl From<&Bet> for BetRow {
    fn from(bet: &Bet) -> Self {
        Self {
            game: bet.matchup(),
            market: bet.market.clone(),
            selection: bet.label(),
            book: bet.book_title.clone(),
            odds: american(bet.american_odds),
            true_probability: bet.true_probability.map(pct).unwrap_or_else(|| "-".into()),
            ev: pct(bet.expected_value),
            confidence: bet.confidence.to_string(),
            source: if bet.has_baseline {
                bet.matched_by.clone().unwrap_or_else(|| "baseline".into())
            } else {
                "estimated".into()
            },
        }
    }
}

pub fn run(args: ScanArgs, config: &AppConfig, mode: OutputMode) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.file)?;
    let games = parse_snapshot(&raw)?;
    let options = args.options(config);

    let finder = PositiveEvFinder::from_config(config);
    let report = finder.scan(&games, &options)?;

    if mode == OutputMode::Json {
        return output::print_json(&report);
    }

    let rows: Vec<BetRow> = report.bets.iter().map(BetRow::from).collect();
    output::print_items(&rows, mode)?;

    let stats = &report.stats;
    output::print_kv(
        "scanned",
        format!(
            "{} games, {} bets ({} matched, {} estimated, {} skipped)",
            stats.games,
            stats.candidate_bets,
            stats.matched_bets,
            stats.estimated_bets,
            stats.skipped_bets
        ),
    );

    if let Some(parlay) = &report.parlay {
        println!();
        let legs: Vec<BetRow> = parlay.legs.iter().map(BetRow::from).collect();
        output::print_items(&legs, mode)?;
        if let Some(analysis) = &parlay.analysis {
            output::print_items(&[ParlaySummaryRow::new("parlay".into(), analysis)], mode)?;
        }
        if let Some(metrics) = &parlay.metrics {
            output::print_kv("confidence", metrics.confidence);
            output::print_kv("odds", num(metrics.combined_odds));
        }
        if !parlay.is_complete() {
            output::print_warn(&format!(
                "only {} of {} requested legs available",
                parlay.leg_count(),
                parlay.requested_legs
            ));
        }
    }

    for error in &report.errors {
        output::print_error(&format!("{}: {}", error.error, error.message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn args() -> ScanArgs {
        ScanArgs {
            file: PathBuf::from("snapshot.json"),
            min_ev: None,
            max_bets: None,
            require_baseline: false,
            legs: None,
            props: false,
            props_ratio: None,
            sports: vec![],
            markets: vec![],
            books: vec![],
        }
    }

    #[test]
    fn test_options_use_config_defaults() {
        let config = AppConfig::default_config();
        let options = args().options(&config);
        assert_eq!(options.finder.min_ev, dec!(0.01));
        assert_eq!(options.finder.max_bets, 20);
        assert_eq!(options.parlay.unwrap().legs, 4);
    }

    #[test]
    fn test_flags_override_config() {
        let config = AppConfig::default_config();
        let mut a = args();
        a.min_ev = Some(dec!(0.03));
        a.legs = Some(0);
        a.books = vec!["fanduel".into()];
        let options = a.options(&config);
        assert_eq!(options.finder.min_ev, dec!(0.03));
        assert_eq!(options.finder.filters.books, vec!["fanduel"]);
        assert!(options.parlay.is_none());
    }
}
