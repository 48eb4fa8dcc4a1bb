//! Expected value calculation
//!
//! EV per unit staked: `p * (d - 1) - (1 - p)`, where `p` is the true (de-vigged)
//! probability and `d` the offered decimal odds.

use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{MarketSubmission, Odds};
use crate::error::{ErrorReport, Result, SharplineError};
use crate::finder::matching::{MatcherChain, Selection};
use crate::pricing::odds::implied_probability;
use crate::pricing::vig::{
    overround, select_baseline_quotes, vig_percentage, BaselineBook, BaselineMarket,
    BaselineOutcome, KeywordBaseline,
};
use crate::validation::{validate_market_submission, validate_probability};

const HIGH_EV: Decimal = dec!(0.05);
const MEDIUM_EV: Decimal = dec!(0.02);

/// Expected profit per unit staked
pub fn single_outcome_ev(true_probability: Decimal, decimal_odds: Decimal) -> Decimal {
    true_probability * (decimal_odds - Decimal::ONE) - (Decimal::ONE - true_probability)
}

/// EV expressed in percent
pub fn edge_percentage(ev: Decimal) -> Decimal {
    ev * dec!(100)
}

/// Full Kelly stake fraction, floored at zero
pub fn kelly_fraction(true_probability: Decimal, decimal_odds: Decimal) -> Decimal {
    let b = decimal_odds - Decimal::ONE;
    if b <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let f = (true_probability * decimal_odds - Decimal::ONE) / b;
    f.max(Decimal::ZERO)
}

/// Confidence tier of a bet by its EV
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Negative,
    Low,
    Medium,
    High,
}

impl Confidence {
    /// `> 5%` high, `> 2%` medium, `> 0%` low, otherwise negative
    pub fn from_ev(ev: Decimal) -> Self {
        if ev > HIGH_EV {
            Confidence::High
        } else if ev > MEDIUM_EV {
            Confidence::Medium
        } else if ev > Decimal::ZERO {
            Confidence::Low
        } else {
            Confidence::Negative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
            Confidence::Negative => "negative",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a true probability came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbabilitySource {
    /// De-vigged from the baseline book
    Baseline,
    /// Derived from the bet's own price under an assumed vig
    Estimated,
    /// Supplied by the caller
    Provided,
    /// No probability supplied; the leg's implied probability was used
    Implied,
    /// Voided leg, contributes certainty
    Push,
}

impl ProbabilitySource {
    pub fn is_estimate(&self) -> bool {
        matches!(self, ProbabilitySource::Estimated | ProbabilitySource::Implied)
    }
}

/// The same price in both formats
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawOdds {
    pub american: Decimal,
    pub decimal: Decimal,
}

impl RawOdds {
    pub fn from_odds(odds: &Odds) -> Result<Self> {
        Ok(Self {
            american: odds.to_american()?,
            decimal: odds.to_decimal()?,
        })
    }
}

/// What one unit staked returns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutProjection {
    /// Total return on a win, stake included
    pub per_dollar: Decimal,
    pub profit_per_dollar: Decimal,
    /// `p * d`: average return including losses
    pub expected_return_per_dollar: Decimal,
}

/// Breakdown of one outcome priced against a true probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeAnalysis {
    pub raw_odds: RawOdds,
    pub implied_probability: Decimal,
    pub true_probability: Decimal,
    pub expected_value: Decimal,
    pub edge_percentage: Decimal,
    pub is_value_bet: bool,
    pub kelly_fraction: Decimal,
    pub payout_projection: PayoutProjection,
}

/// Price a single outcome
pub fn process_outcome(odds: &Odds, true_probability: Decimal) -> Result<OutcomeAnalysis> {
    validate_probability(true_probability, "trueProbability")?;
    let raw_odds = RawOdds::from_odds(odds)?;
    let decimal = raw_odds.decimal;
    let ev = single_outcome_ev(true_probability, decimal);

    Ok(OutcomeAnalysis {
        raw_odds,
        implied_probability: implied_probability(decimal)?,
        true_probability,
        expected_value: ev,
        edge_percentage: edge_percentage(ev),
        is_value_bet: ev > Decimal::ZERO,
        kelly_fraction: kelly_fraction(true_probability, decimal),
        payout_projection: PayoutProjection {
            per_dollar: decimal,
            profit_per_dollar: decimal - Decimal::ONE,
            expected_return_per_dollar: true_probability * decimal,
        },
    })
}

/// One book's outcome within a market analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookOutcome {
    pub book: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<Decimal>,
    #[serde(flatten)]
    pub analysis: OutcomeAnalysis,
}

/// Margin charged by one book on the market
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VigSummary {
    pub vig_percentage: Decimal,
    pub overround: Decimal,
}

/// All books' outcomes priced against the baseline for one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAnalysis {
    pub market: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<String>,
    pub baseline_book: String,
    pub baseline: Vec<BaselineOutcome>,
    pub outcomes: Vec<BookOutcome>,
    pub market_vig: BTreeMap<String, VigSummary>,
    pub value_bets: Vec<BookOutcome>,
    pub best_value_bet: Option<BookOutcome>,
}

/// Per-market result in a batch: the analysis, or the error that stopped it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketReport {
    pub market: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<MarketAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl MarketReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Prices whole markets against the baseline book's de-vigged probabilities
#[derive(Clone)]
pub struct EvCalculator {
    baseline: Arc<dyn BaselineBook>,
    matcher: Arc<MatcherChain>,
}

impl EvCalculator {
    pub fn new(baseline: Arc<dyn BaselineBook>, matcher: Arc<MatcherChain>) -> Self {
        Self { baseline, matcher }
    }

    /// Analyze one market.
    ///
    /// Outcomes are paired with the baseline by index. The pairing is checked
    /// first: every book must list the baseline's outcomes in the same order, or
    /// the market fails with `OutcomeMismatch`.
    pub fn process_market(&self, submission: &MarketSubmission) -> Result<MarketAnalysis> {
        validate_market_submission(submission, self.baseline.as_ref())?;

        let baseline_quotes = select_baseline_quotes(&submission.books, self.baseline.as_ref())
            .ok_or_else(|| {
                SharplineError::BaselineUnavailable(format!(
                    "no baseline book quotes {}",
                    submission.market
                ))
            })?;
        let baseline = BaselineMarket::from_outcomes(
            &baseline_quotes.name,
            &submission.market,
            &baseline_quotes.outcomes,
        )?;
        let probabilities = baseline.probabilities();

        let mut outcomes = Vec::new();
        let mut market_vig = BTreeMap::new();

        for book in &submission.books {
            if book.outcomes.len() != baseline.outcomes.len() {
                return Err(SharplineError::OutcomeMismatch {
                    book: book.name.clone(),
                    index: book.outcomes.len().min(baseline.outcomes.len()),
                    expected: format!("{} outcomes", baseline.outcomes.len()),
                    found: format!("{} outcomes", book.outcomes.len()),
                });
            }

            let mut implied = Vec::with_capacity(book.outcomes.len());
            for (index, (quote, reference)) in
                book.outcomes.iter().zip(baseline.outcomes.iter()).enumerate()
            {
                if !self
                    .matcher
                    .is_match(Selection::from(quote), Selection::from(reference))
                {
                    return Err(SharplineError::OutcomeMismatch {
                        book: book.name.clone(),
                        index,
                        expected: reference.name.clone(),
                        found: quote.name.clone(),
                    });
                }

                let analysis = process_outcome(&quote.odds()?, probabilities[index])?;
                implied.push(analysis.implied_probability);
                outcomes.push(BookOutcome {
                    book: book.name.clone(),
                    name: quote.name.clone(),
                    description: quote.description.clone(),
                    point: quote.point,
                    analysis,
                });
            }

            market_vig.insert(
                book.name.clone(),
                VigSummary {
                    vig_percentage: vig_percentage(&implied),
                    overround: overround(&implied),
                },
            );
        }

        let value_bets: Vec<BookOutcome> = outcomes
            .iter()
            .filter(|o| o.analysis.is_value_bet)
            .cloned()
            .collect();
        let best_value_bet = value_bets
            .iter()
            .max_by(|a, b| a.analysis.expected_value.cmp(&b.analysis.expected_value))
            .cloned();

        debug!(
            market = %submission.market,
            books = submission.books.len(),
            value_bets = value_bets.len(),
            "market processed"
        );

        Ok(MarketAnalysis {
            market: submission.market.clone(),
            game: submission.game.clone(),
            baseline_book: baseline.book.clone(),
            baseline: baseline.outcomes,
            outcomes,
            market_vig,
            value_bets,
            best_value_bet,
        })
    }

    /// Analyze a batch of markets in parallel. A failing market becomes an
    /// error entry and never aborts the others.
    pub fn process_markets(&self, submissions: &[MarketSubmission]) -> Vec<MarketReport> {
        submissions
            .par_iter()
            .map(|submission| match self.process_market(submission) {
                Ok(analysis) => MarketReport {
                    market: submission.market.clone(),
                    game: submission.game.clone(),
                    analysis: Some(analysis),
                    error: None,
                },
                Err(e) => {
                    warn!(market = %submission.market, error = %e, "market skipped");
                    MarketReport {
                        market: submission.market.clone(),
                        game: submission.game.clone(),
                        analysis: None,
                        error: Some(e.report()),
                    }
                }
            })
            .collect()
    }
}

impl Default for EvCalculator {
    fn default() -> Self {
        Self::new(
            Arc::new(KeywordBaseline::default()),
            Arc::new(MatcherChain::default()),
        )
    }
}
