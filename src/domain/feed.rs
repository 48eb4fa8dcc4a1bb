//! Point-in-time odds snapshot as supplied by the upstream feed
//!
//! The shape follows The Odds API v4 `/odds` response with `oddsFormat=american`:
//! games own bookmakers, bookmakers own markets, markets own outcomes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::market::MarketKind;
use super::odds::{Odds, OddsFormat};
use crate::error::Result;

/// A single game with odds from multiple bookmakers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub sport_key: String,
    #[serde(default)]
    pub sport_title: String,
    pub commence_time: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<Bookmaker>,
}

impl Game {
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }

    pub fn bookmaker(&self, key: &str) -> Option<&Bookmaker> {
        self.bookmakers.iter().find(|b| b.key == key)
    }
}

/// Bookmaker quotes for a game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmaker {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub markets: Vec<BookMarket>,
}

impl Bookmaker {
    pub fn market(&self, key: &str) -> Option<&BookMarket> {
        self.markets.iter().find(|m| m.key == key)
    }

    pub fn display_name(&self) -> &str {
        if self.title.is_empty() {
            &self.key
        } else {
            &self.title
        }
    }
}

/// One market (h2h, spreads, totals, player props...) as quoted by one book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookMarket {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<OutcomeQuote>,
}

impl BookMarket {
    pub fn kind(&self) -> MarketKind {
        MarketKind::from_key(&self.key)
    }

    /// Decimal odds for every outcome, in quoted order
    pub fn decimal_odds(&self) -> Result<Vec<Decimal>> {
        self.outcomes
            .iter()
            .map(|o| o.odds().and_then(|odds| odds.to_decimal()))
            .collect()
    }
}

/// A named selection with its American price and optional line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeQuote {
    pub name: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<Decimal>,
    /// Player name for player-prop markets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OutcomeQuote {
    pub fn new(name: impl Into<String>, price: i32) -> Self {
        Self {
            name: name.into(),
            price: Decimal::from(price),
            point: None,
            description: None,
        }
    }

    pub fn with_point(mut self, point: Decimal) -> Self {
        self.point = Some(point);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Feed prices are American integers
    pub fn odds(&self) -> Result<Odds> {
        Odds::from_value(self.price, OddsFormat::American)
    }

    /// Human label, e.g. `LeBron James Over 25.5` or `Lakers -3.5`
    pub fn label(&self) -> String {
        let mut label = match &self.description {
            Some(player) => format!("{} {}", player, self.name),
            None => self.name.clone(),
        };
        if let Some(point) = self.point {
            if point > Decimal::ZERO && self.description.is_none() && !is_total_side(&self.name)
            {
                label.push_str(&format!(" +{}", point.normalize()));
            } else {
                label.push_str(&format!(" {}", point.normalize()));
            }
        }
        label
    }
}

fn is_total_side(name: &str) -> bool {
    name.eq_ignore_ascii_case("over") || name.eq_ignore_ascii_case("under")
}

/// Snapshot files may be a bare array of games or `{ "games": [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Games(Vec<Game>),
    Wrapped { games: Vec<Game> },
}

/// Parse a JSON odds snapshot
pub fn parse_snapshot(json: &str) -> Result<Vec<Game>> {
    let file: SnapshotFile = serde_json::from_str(json)?;
    Ok(match file {
        SnapshotFile::Games(games) => games,
        SnapshotFile::Wrapped { games } => games,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const GAME_JSON: &str = r#"{
        "id": "g1",
        "sport_key": "basketball_nba",
        "sport_title": "NBA",
        "commence_time": "2024-01-15T00:10:00Z",
        "home_team": "Boston Celtics",
        "away_team": "Los Angeles Lakers",
        "bookmakers": [{
            "key": "pinnacle",
            "title": "Pinnacle",
            "markets": [{
                "key": "spreads",
                "outcomes": [
                    {"name": "Boston Celtics", "price": -105, "point": -3.5},
                    {"name": "Los Angeles Lakers", "price": -105, "point": 3.5}
                ]
            }]
        }]
    }"#;

    #[test]
    fn test_parse_single_game() {
        let game: Game = serde_json::from_str(GAME_JSON).unwrap();
        assert_eq!(game.matchup(), "Los Angeles Lakers @ Boston Celtics");
        let market = game.bookmaker("pinnacle").unwrap().market("spreads").unwrap();
        assert_eq!(market.outcomes[0].price, dec!(-105));
        assert_eq!(market.outcomes[1].point, Some(dec!(3.5)));
        assert_eq!(market.kind(), MarketKind::Spread);
    }

    #[test]
    fn test_parse_snapshot_shapes() {
        let bare = format!("[{}]", GAME_JSON);
        assert_eq!(parse_snapshot(&bare).unwrap().len(), 1);

        let wrapped = format!("{{\"games\": [{}]}}", GAME_JSON);
        assert_eq!(parse_snapshot(&wrapped).unwrap().len(), 1);

        assert!(parse_snapshot("{\"nope\": 1}").is_err());
    }

    #[test]
    fn test_decimal_odds_in_order() {
        let game: Game = serde_json::from_str(GAME_JSON).unwrap();
        let market = game.bookmaker("pinnacle").unwrap().market("spreads").unwrap();
        let odds = market.decimal_odds().unwrap();
        assert_eq!(odds.len(), 2);
        assert_eq!(odds[0], odds[1]);
    }

    #[test]
    fn test_fractional_price_rejected() {
        let quote = OutcomeQuote {
            name: "Lakers".into(),
            price: dec!(-110.5),
            point: None,
            description: None,
        };
        assert!(quote.odds().is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            OutcomeQuote::new("Lakers", 120).with_point(dec!(3.5)).label(),
            "Lakers +3.5"
        );
        assert_eq!(
            OutcomeQuote::new("Over", -110).with_point(dec!(220.5)).label(),
            "Over 220.5"
        );
        assert_eq!(
            OutcomeQuote::new("Over", -115)
                .with_point(dec!(25.5))
                .with_description("LeBron James")
                .label(),
            "LeBron James Over 25.5"
        );
    }
}
