use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Bookmaker, Game, MarketKind, OutcomeQuote};
use crate::error::Result;
use crate::finder::matching::{normalize_name, Selection};
use crate::pricing::ev::{Confidence, ProbabilitySource};
use crate::pricing::odds::implied_probability;

/// One bookable selection from the feed, priced once EV has been calculated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub game_id: String,
    pub sport: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    pub market: String,
    pub market_kind: MarketKind,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<Decimal>,
    pub book: String,
    pub book_title: String,
    pub american_odds: Decimal,
    pub decimal_odds: Decimal,
    pub implied_probability: Decimal,
    pub true_probability: Option<Decimal>,
    pub expected_value: Decimal,
    pub edge_percentage: Decimal,
    pub confidence: Confidence,
    pub has_baseline: bool,
    pub probability_source: Option<ProbabilitySource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<String>,
}

impl Bet {
    /// Unpriced bet for one outcome quote
    pub fn from_quote(
        game: &Game,
        book: &Bookmaker,
        market: &str,
        quote: &OutcomeQuote,
    ) -> Result<Self> {
        let odds = quote.odds()?;
        let decimal = odds.to_decimal()?;
        Ok(Self {
            game_id: game.id.clone(),
            sport: game.sport_key.clone(),
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            commence_time: game.commence_time,
            market: market.to_string(),
            market_kind: MarketKind::from_key(market),
            outcome: quote.name.clone(),
            description: quote.description.clone(),
            point: quote.point,
            book: book.key.clone(),
            book_title: book.display_name().to_string(),
            american_odds: quote.price,
            decimal_odds: decimal,
            implied_probability: implied_probability(decimal)?,
            true_probability: None,
            expected_value: Decimal::ZERO,
            edge_percentage: Decimal::ZERO,
            confidence: Confidence::Negative,
            has_baseline: false,
            probability_source: None,
            matched_by: None,
        })
    }

    pub fn is_player_prop(&self) -> bool {
        self.market_kind.is_player_prop()
    }

    pub fn selection(&self) -> Selection<'_> {
        Selection {
            name: &self.outcome,
            description: self.description.as_deref(),
            point: self.point,
        }
    }

    /// Player the prop is about; falls back to the outcome name
    pub fn player(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.outcome)
    }

    /// Normalized identity of the selection inside its market
    pub fn selection_key(&self) -> String {
        let mut key = normalize_name(&self.outcome);
        if let Some(player) = &self.description {
            key = format!("{}:{}", normalize_name(player), key);
        }
        if let Some(point) = self.point {
            key = format!("{}@{}", key, point.normalize());
        }
        key
    }

    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }

    pub fn label(&self) -> String {
        let mut label = match &self.description {
            Some(player) => format!("{} {}", player, self.outcome),
            None => self.outcome.clone(),
        };
        if let Some(point) = self.point {
            label.push_str(&format!(" {}", point.normalize()));
        }
        label
    }
}

/// Optional narrowing of the candidate pool. Empty lists mean "everything".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetFilters {
    #[serde(default)]
    pub sports: Vec<String>,
    #[serde(default)]
    pub markets: Vec<String>,
    #[serde(default)]
    pub books: Vec<String>,
}

fn allowed(list: &[String], value: &str) -> bool {
    list.is_empty() || list.iter().any(|v| v.eq_ignore_ascii_case(value))
}

impl BetFilters {
    pub fn allows_sport(&self, sport: &str) -> bool {
        allowed(&self.sports, sport)
    }

    pub fn allows_market(&self, market: &str) -> bool {
        allowed(&self.markets, market)
    }

    pub fn allows_book(&self, book: &Bookmaker) -> bool {
        allowed(&self.books, &book.key)
    }
}
