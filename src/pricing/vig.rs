//! Vig removal
//!
//! Measures a market's overround and strips it proportionally to get fair
//! probabilities. Proportional de-vig is a simplification; power and Shin's
//! methods are not implemented.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{BookQuotes, Bookmaker, OutcomeQuote};
use crate::error::{Result, SharplineError};
use crate::pricing::odds::implied_probability;

/// Sum of implied probabilities
pub fn overround(implied: &[Decimal]) -> Decimal {
    implied.iter().copied().sum()
}

/// Bookmaker margin as a fraction (`overround - 1`)
pub fn vig_percentage(implied: &[Decimal]) -> Decimal {
    overround(implied) - Decimal::ONE
}

/// Proportional de-vig: each implied probability divided by the overround
pub fn remove_vig(implied: &[Decimal]) -> Result<Vec<Decimal>> {
    if implied.is_empty() {
        return Err(SharplineError::InvalidMarket(
            "cannot remove vig from an empty market".into(),
        ));
    }
    if let Some(p) = implied.iter().find(|p| p.is_sign_negative()) {
        return Err(SharplineError::InvalidMarket(format!(
            "implied probability cannot be negative: {}",
            p
        )));
    }
    let total = overround(implied);
    if total <= Decimal::ZERO {
        return Err(SharplineError::InvalidMarket(format!(
            "overround must be positive, got {}",
            total
        )));
    }
    Ok(implied.iter().map(|p| *p / total).collect())
}

/// Decides which books are sharp enough to serve as the de-vig baseline
pub trait BaselineBook: Send + Sync {
    fn is_baseline_name(&self, name: &str) -> bool;

    fn is_baseline(&self, book: &Bookmaker) -> bool {
        self.is_baseline_name(&book.key) || self.is_baseline_name(&book.title)
    }
}

/// Case-insensitive substring match on book key/title
#[derive(Debug, Clone)]
pub struct KeywordBaseline {
    keywords: Vec<String>,
}

impl KeywordBaseline {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for KeywordBaseline {
    fn default() -> Self {
        Self::new(["pinnacle"])
    }
}

impl BaselineBook for KeywordBaseline {
    fn is_baseline_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.keywords.iter().any(|k| name.contains(k.as_str()))
    }
}

/// One baseline outcome with its fair probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineOutcome {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<Decimal>,
    pub decimal_odds: Decimal,
    pub implied_probability: Decimal,
    pub fair_probability: Decimal,
}

/// No-vig probability vector for one (game, market) from the baseline book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineMarket {
    pub book: String,
    pub market: String,
    pub overround: Decimal,
    pub vig_percentage: Decimal,
    pub outcomes: Vec<BaselineOutcome>,
}

impl BaselineMarket {
    /// Decimalize and de-vig one book's quotes, keeping their order
    pub fn from_outcomes(book: &str, market: &str, outcomes: &[OutcomeQuote]) -> Result<Self> {
        let decimals = outcomes
            .iter()
            .map(|o| o.odds().and_then(|odds| odds.to_decimal()))
            .collect::<Result<Vec<_>>>()?;
        let implied = decimals
            .iter()
            .map(|d| implied_probability(*d))
            .collect::<Result<Vec<_>>>()?;
        let fair = remove_vig(&implied)?;

        let outcomes = outcomes
            .iter()
            .zip(decimals.iter().zip(implied.iter().zip(fair.iter())))
            .map(|(quote, (decimal, (imp, fair)))| BaselineOutcome {
                name: quote.name.clone(),
                description: quote.description.clone(),
                point: quote.point,
                decimal_odds: *decimal,
                implied_probability: *imp,
                fair_probability: *fair,
            })
            .collect();

        Ok(Self {
            book: book.to_string(),
            market: market.to_string(),
            overround: overround(&implied),
            vig_percentage: vig_percentage(&implied),
            outcomes,
        })
    }

    pub fn probabilities(&self) -> Vec<Decimal> {
        self.outcomes.iter().map(|o| o.fair_probability).collect()
    }
}

/// First bookmaker accepted by the baseline predicate
pub fn select_baseline_book<'a>(
    books: &'a [Bookmaker],
    baseline: &dyn BaselineBook,
) -> Option<&'a Bookmaker> {
    books.iter().find(|b| baseline.is_baseline(b))
}

/// First submitted book accepted by the baseline predicate
pub fn select_baseline_quotes<'a>(
    books: &'a [BookQuotes],
    baseline: &dyn BaselineBook,
) -> Option<&'a BookQuotes> {
    books.iter().find(|b| baseline.is_baseline_name(&b.name))
}

/// Baseline probabilities for `market` from the game's sharp book, if it quotes one
pub fn get_baseline(
    market: &str,
    books: &[Bookmaker],
    baseline: &dyn BaselineBook,
) -> Option<Result<BaselineMarket>> {
    let book = books
        .iter()
        .filter(|b| baseline.is_baseline(b))
        .find(|b| b.market(market).is_some())?;
    let quotes = book.market(market)?;
    Some(BaselineMarket::from_outcomes(&book.key, market, &quotes.outcomes))
}
