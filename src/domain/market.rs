use serde::{Deserialize, Serialize};

use super::feed::OutcomeQuote;

/// Market type derived from the feed's market key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    Moneyline,
    Spread,
    Total,
    PlayerProp,
    Other,
}

const PLAYER_PROP_PREFIXES: &[&str] = &["player_", "batter_", "pitcher_"];

impl MarketKind {
    pub fn from_key(key: &str) -> Self {
        let key = key.to_ascii_lowercase();
        if PLAYER_PROP_PREFIXES.iter().any(|p| key.starts_with(p)) {
            return MarketKind::PlayerProp;
        }
        match key.as_str() {
            "h2h" | "moneyline" => MarketKind::Moneyline,
            "spreads" | "spread" => MarketKind::Spread,
            "totals" | "total" => MarketKind::Total,
            _ => MarketKind::Other,
        }
    }

    pub fn is_player_prop(&self) -> bool {
        matches!(self, MarketKind::PlayerProp)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketKind::Moneyline => "moneyline",
            MarketKind::Spread => "spread",
            MarketKind::Total => "total",
            MarketKind::PlayerProp => "player_prop",
            MarketKind::Other => "other",
        }
    }
}

impl std::fmt::Display for MarketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One book's quotes for a single market, as submitted for market analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookQuotes {
    pub name: String,
    pub outcomes: Vec<OutcomeQuote>,
}

/// A market submitted on its own: every book quoting the same outcomes in the same order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSubmission {
    pub market: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<String>,
    pub books: Vec<BookQuotes>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_kind_from_key() {
        assert_eq!(MarketKind::from_key("h2h"), MarketKind::Moneyline);
        assert_eq!(MarketKind::from_key("spreads"), MarketKind::Spread);
        assert_eq!(MarketKind::from_key("totals"), MarketKind::Total);
        assert_eq!(MarketKind::from_key("player_points"), MarketKind::PlayerProp);
        assert_eq!(MarketKind::from_key("batter_home_runs"), MarketKind::PlayerProp);
        assert_eq!(MarketKind::from_key("alternate_spreads"), MarketKind::Other);
        assert!(MarketKind::from_key("PLAYER_ASSISTS").is_player_prop());
    }
}
