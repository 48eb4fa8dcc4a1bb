//! Positive-EV finder
//!
//! Feed in, ranked bets and an assembled parlay out:
//! baseline extraction → bet flattening → EV per bet → rank → parlay.

pub mod baseline;
pub mod bet;
pub mod matching;
pub mod selection;

pub use baseline::{extract_baseline, BaselineExtraction, BaselineIndex, MarketBaseline};
pub use bet::{Bet, BetFilters};
pub use matching::{ExactMatch, MatcherChain, NormalizedMatch, OutcomeMatcher, Selection};
pub use selection::{build_optimal_parlay, AssembledParlay, ParlayMetrics, ParlayOptions};

use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, EstimationConfig};
use crate::domain::Game;
use crate::error::{ErrorReport, Result};
use crate::pricing::ev::{edge_percentage, single_outcome_ev, Confidence, ProbabilitySource};
use crate::pricing::vig::{BaselineBook, BaselineOutcome, KeywordBaseline};
use crate::validation::validate_finder_options;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinderOptions {
    pub min_ev: Decimal,
    pub max_bets: usize,
    #[serde(default)]
    pub require_baseline: bool,
    #[serde(default)]
    pub filters: BetFilters,
}

impl Default for FinderOptions {
    fn default() -> Self {
        Self::from(&crate::config::FinderConfig::default())
    }
}

impl From<&crate::config::FinderConfig> for FinderOptions {
    fn from(config: &crate::config::FinderConfig) -> Self {
        Self {
            min_ev: config.min_ev,
            max_bets: config.max_bets,
            require_baseline: config.require_baseline,
            filters: BetFilters::default(),
        }
    }
}

/// Counters for one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub games: usize,
    pub candidate_bets: usize,
    pub matched_bets: usize,
    pub estimated_bets: usize,
    /// Quotes dropped for invalid odds
    pub skipped_bets: usize,
    pub baseline_markets: usize,
    pub failed_markets: usize,
    pub returned_bets: usize,
}

/// Ranked bets from [`PositiveEvFinder::find_positive_ev_bets`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinderReport {
    pub bets: Vec<Bet>,
    pub stats: ScanStats,
    pub errors: Vec<ErrorReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOptions {
    pub finder: FinderOptions,
    /// Skip parlay assembly when None
    #[serde(default)]
    pub parlay: Option<ParlayOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub bets: Vec<Bet>,
    pub parlay: Option<AssembledParlay>,
    pub stats: ScanStats,
    pub errors: Vec<ErrorReport>,
}

/// Flattened bets plus the number of quotes that could not be parsed
#[derive(Debug, Clone, Default)]
pub struct BetExtraction {
    pub bets: Vec<Bet>,
    pub skipped: usize,
}

/// Finds positive-EV bets across a multi-game, multi-book feed
#[derive(Clone)]
pub struct PositiveEvFinder {
    baseline: Arc<dyn BaselineBook>,
    matcher: Arc<MatcherChain>,
    estimation: EstimationConfig,
}

impl std::fmt::Debug for PositiveEvFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositiveEvFinder")
            .field("matcher", &self.matcher)
            .field("estimation", &self.estimation)
            .finish()
    }
}

impl Default for PositiveEvFinder {
    fn default() -> Self {
        Self::new(
            Arc::new(KeywordBaseline::default()),
            Arc::new(MatcherChain::default()),
            EstimationConfig::default(),
        )
    }
}

impl PositiveEvFinder {
    pub fn new(
        baseline: Arc<dyn BaselineBook>,
        matcher: Arc<MatcherChain>,
        estimation: EstimationConfig,
    ) -> Self {
        Self {
            baseline,
            matcher,
            estimation,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(KeywordBaseline::new(config.baseline.books.iter())),
            Arc::new(MatcherChain::default()),
            config.estimation.clone(),
        )
    }

    /// Per game, de-vig every market of the baseline book
    pub fn extract_baseline(&self, games: &[Game]) -> BaselineExtraction {
        extract_baseline(games, self.baseline.as_ref())
    }

    /// Flatten game → book → market → outcome into unpriced bets
    pub fn extract_all_bets(&self, games: &[Game], filters: &BetFilters) -> BetExtraction {
        let mut extraction = BetExtraction::default();

        for game in games.iter().filter(|g| filters.allows_sport(&g.sport_key)) {
            for book in game.bookmakers.iter().filter(|b| filters.allows_book(b)) {
                for market in book.markets.iter().filter(|m| filters.allows_market(&m.key)) {
                    for quote in &market.outcomes {
                        match Bet::from_quote(game, book, &market.key, quote) {
                            Ok(bet) => extraction.bets.push(bet),
                            Err(e) => {
                                warn!(
                                    game = %game.id,
                                    book = %book.key,
                                    market = %market.key,
                                    outcome = %quote.name,
                                    error = %e,
                                    "skipping quote"
                                );
                                extraction.skipped += 1;
                            }
                        }
                    }
                }
            }
        }

        extraction
    }

    /// Baseline outcome for a bet, with the matcher that paired them
    pub fn match_outcome<'b>(
        &self,
        bet: &Bet,
        baseline: &'b [BaselineOutcome],
    ) -> Option<(&'b BaselineOutcome, &'static str)> {
        self.matcher.find(bet.selection(), baseline)
    }

    /// Conservative EV for a bet with no baseline: assume a fixed vig on its
    /// own price, then discount the result. Returns (true probability, EV).
    pub fn estimate_ev_without_baseline(&self, bet: &Bet) -> (Decimal, Decimal) {
        let vig = if bet.is_player_prop() {
            self.estimation.player_prop_vig
        } else {
            self.estimation.standard_vig
        };
        let true_probability = bet.implied_probability / (Decimal::ONE + vig);
        let ev = single_outcome_ev(true_probability, bet.decimal_odds)
            * (Decimal::ONE - self.estimation.uncertainty_discount);
        (true_probability, ev)
    }

    fn price_bet(&self, mut bet: Bet, index: &BaselineIndex) -> Bet {
        let matched = index
            .get(&bet.game_id, &bet.market)
            .and_then(|b| self.match_outcome(&bet, &b.outcomes));

        match matched {
            Some((outcome, matcher)) => {
                let p = outcome.fair_probability;
                let ev = single_outcome_ev(p, bet.decimal_odds);
                bet.true_probability = Some(p);
                bet.expected_value = ev;
                bet.edge_percentage = edge_percentage(ev);
                bet.confidence = Confidence::from_ev(ev);
                bet.has_baseline = true;
                bet.probability_source = Some(ProbabilitySource::Baseline);
                bet.matched_by = Some(matcher.to_string());
            }
            None => {
                let (p, ev) = self.estimate_ev_without_baseline(&bet);
                bet.true_probability = Some(p);
                bet.expected_value = ev;
                bet.edge_percentage = edge_percentage(ev);
                bet.confidence = Confidence::Low;
                bet.has_baseline = false;
                bet.probability_source = Some(ProbabilitySource::Estimated);
                bet.matched_by = None;
            }
        }
        bet
    }

    /// Price every bet against the baseline, estimating where none matches
    pub fn calculate_bet_evs(&self, bets: Vec<Bet>, index: &BaselineIndex) -> Vec<Bet> {
        bets.into_par_iter()
            .map(|bet| self.price_bet(bet, index))
            .collect()
    }

    /// Full pipeline: extract, price, filter, rank and truncate
    pub fn find_positive_ev_bets(
        &self,
        games: &[Game],
        options: &FinderOptions,
    ) -> Result<FinderReport> {
        validate_finder_options(options.max_bets, 1, Decimal::ZERO)?;

        let baseline = self.extract_baseline(games);
        let extraction = self.extract_all_bets(games, &options.filters);
        let candidate_bets = extraction.bets.len();
        let priced = self.calculate_bet_evs(extraction.bets, &baseline.index);

        let matched_bets = priced.iter().filter(|b| b.has_baseline).count();
        let estimated_bets = priced.len() - matched_bets;

        let mut bets: Vec<Bet> = priced
            .into_iter()
            .filter(|b| b.expected_value >= options.min_ev)
            .filter(|b| !options.require_baseline || b.has_baseline)
            .collect();
        bets.sort_by(|a, b| b.expected_value.cmp(&a.expected_value));
        bets.truncate(options.max_bets);

        let stats = ScanStats {
            games: games.len(),
            candidate_bets,
            matched_bets,
            estimated_bets,
            skipped_bets: extraction.skipped,
            baseline_markets: baseline.index.len(),
            failed_markets: baseline.failures.len(),
            returned_bets: bets.len(),
        };

        debug!(
            games_without_baseline = baseline.games_without_baseline,
            "baseline coverage"
        );
        info!(
            games = stats.games,
            candidates = stats.candidate_bets,
            matched = stats.matched_bets,
            estimated = stats.estimated_bets,
            skipped = stats.skipped_bets,
            returned = stats.returned_bets,
            "positive EV scan complete"
        );

        Ok(FinderReport {
            bets,
            stats,
            errors: baseline.failures,
        })
    }

    pub fn build_optimal_parlay(
        &self,
        bets: &[Bet],
        options: &ParlayOptions,
    ) -> Result<AssembledParlay> {
        build_optimal_parlay(bets, options)
    }

    /// Ranked bets plus an optional parlay. A parlay failure is reported in
    /// `errors` and leaves the ranked bets intact.
    pub fn scan(&self, games: &[Game], options: &ScanOptions) -> Result<ScanReport> {
        let report = self.find_positive_ev_bets(games, &options.finder)?;
        let mut errors = report.errors;

        let parlay = match &options.parlay {
            Some(parlay_options) => match build_optimal_parlay(&report.bets, parlay_options) {
                Ok(parlay) => Some(parlay),
                Err(e) => {
                    warn!(error = %e, "parlay assembly failed");
                    errors.push(e.report());
                    None
                }
            },
            None => None,
        };

        Ok(ScanReport {
            bets: report.bets,
            parlay,
            stats: report.stats,
            errors,
        })
    }
}
