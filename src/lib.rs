pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod finder;
pub mod pricing;
pub mod validation;

pub use config::AppConfig;
pub use domain::{
    BookMarket, Bookmaker, Game, MarketKind, MarketSubmission, Odds, OddsFormat, OutcomeQuote,
};
pub use error::{ErrorReport, Result, SharplineError};
pub use finder::{
    AssembledParlay, Bet, BetFilters, FinderOptions, FinderReport, ParlayOptions, PositiveEvFinder,
    ScanOptions, ScanReport, ScanStats,
};
pub use pricing::{
    calculate_parlay, compare_parlays, EvCalculator, KeywordBaseline, MarketAnalysis,
    ParlayAnalysis, ParlayLeg,
};
