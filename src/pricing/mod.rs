//! Pricing core
//!
//! - `odds` - American / decimal / implied probability conversions
//! - `vig` - overround, proportional de-vig and baseline book selection
//! - `ev` - single-outcome and whole-market expected value
//! - `parlay` - multi-leg combination with push handling

pub mod ev;
pub mod odds;
pub mod parlay;
pub mod vig;

pub use ev::{
    edge_percentage, kelly_fraction, process_outcome, single_outcome_ev, BookOutcome,
    Confidence, EvCalculator, MarketAnalysis, MarketReport, OutcomeAnalysis, PayoutProjection,
    ProbabilitySource, RawOdds, VigSummary,
};
pub use odds::{
    american_to_decimal, decimal_to_american, decimal_to_american_rounded, implied_probability,
    normalize,
};
pub use parlay::{
    calculate_parlay, compare_parlays, evaluate_request, ParlayAnalysis, ParlayComparison,
    ParlayLeg, ParlayLegInput, ParlayRequest, PushInfo, RankedParlay,
};
pub use vig::{
    get_baseline, overround, remove_vig, vig_percentage, BaselineBook, BaselineMarket,
    BaselineOutcome, KeywordBaseline,
};
