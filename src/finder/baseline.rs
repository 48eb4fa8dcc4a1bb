//! Baseline extraction across a whole feed
//!
//! For every game the first baseline-eligible book is de-vigged market by
//! market. Player-prop markets list many players in one market, so they are
//! de-vigged per (player, line) group instead of as one vector. A group with a
//! single side has nothing to de-vig against and is reported, not indexed.

use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::domain::{BookMarket, Game, OutcomeQuote};
use crate::error::{ErrorReport, SharplineError};
use crate::finder::matching::normalize_name;
use crate::pricing::vig::{select_baseline_book, BaselineBook, BaselineMarket, BaselineOutcome};

/// Baseline outcomes for one (game, market)
#[derive(Debug, Clone, PartialEq)]
pub struct MarketBaseline {
    pub book: String,
    pub outcomes: Vec<BaselineOutcome>,
}

/// Baselines keyed by (game id, market key)
#[derive(Debug, Clone, Default)]
pub struct BaselineIndex {
    markets: HashMap<(String, String), MarketBaseline>,
}

impl BaselineIndex {
    pub fn get(&self, game_id: &str, market: &str) -> Option<&MarketBaseline> {
        self.markets.get(&(game_id.to_string(), market.to_string()))
    }

    pub fn insert(&mut self, game_id: &str, market: &str, baseline: MarketBaseline) {
        self.markets
            .insert((game_id.to_string(), market.to_string()), baseline);
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

/// Result of scanning a feed for baselines
#[derive(Debug, Clone, Default)]
pub struct BaselineExtraction {
    pub index: BaselineIndex,
    /// Games with no baseline-eligible book
    pub games_without_baseline: usize,
    /// Markets (or prop groups) that could not be de-vigged
    pub failures: Vec<ErrorReport>,
}

fn prop_groups(outcomes: &[OutcomeQuote]) -> Vec<Vec<OutcomeQuote>> {
    let mut groups: BTreeMap<(String, String), Vec<OutcomeQuote>> = BTreeMap::new();
    for outcome in outcomes {
        let player = outcome
            .description
            .as_deref()
            .map(normalize_name)
            .unwrap_or_default();
        let line = outcome
            .point
            .map(|p| p.normalize().to_string())
            .unwrap_or_default();
        groups.entry((player, line)).or_default().push(outcome.clone());
    }
    groups.into_values().collect()
}

fn devig_market(
    game: &Game,
    book: &str,
    market: &BookMarket,
) -> (Option<MarketBaseline>, Vec<ErrorReport>) {
    let groups = if market.kind().is_player_prop() {
        prop_groups(&market.outcomes)
    } else {
        vec![market.outcomes.clone()]
    };

    let mut outcomes = Vec::new();
    let mut failures = Vec::new();
    for group in groups {
        if let [quote] = group.as_slice() {
            debug!(
                game = %game.id,
                market = %market.key,
                outcome = %quote.label(),
                "one-sided baseline group"
            );
            let e = SharplineError::InvalidMarket(format!(
                "{} {}: one-sided group for {}",
                game.id,
                market.key,
                quote.label()
            ));
            failures.push(e.report());
            continue;
        }
        match BaselineMarket::from_outcomes(book, &market.key, &group) {
            Ok(baseline) => outcomes.extend(baseline.outcomes),
            Err(e) => {
                warn!(game = %game.id, market = %market.key, error = %e, "baseline market skipped");
                let mut report = e.report();
                report.message = format!("{} {}: {}", game.id, market.key, report.message);
                failures.push(report);
            }
        }
    }

    if outcomes.is_empty() {
        (None, failures)
    } else {
        (
            Some(MarketBaseline {
                book: book.to_string(),
                outcomes,
            }),
            failures,
        )
    }
}

/// De-vig every market quoted by each game's baseline book
pub fn extract_baseline(games: &[Game], baseline: &dyn BaselineBook) -> BaselineExtraction {
    let per_game: Vec<(Vec<(String, String, MarketBaseline)>, Vec<ErrorReport>, bool)> = games
        .par_iter()
        .map(|game| {
            let Some(book) = select_baseline_book(&game.bookmakers, baseline) else {
                debug!(game = %game.id, "no baseline book");
                return (Vec::new(), Vec::new(), false);
            };

            let mut entries = Vec::new();
            let mut failures = Vec::new();
            for market in &book.markets {
                let (found, errors) = devig_market(game, &book.key, market);
                failures.extend(errors);
                if let Some(found) = found {
                    entries.push((game.id.clone(), market.key.clone(), found));
                }
            }
            (entries, failures, true)
        })
        .collect();

    let mut extraction = BaselineExtraction::default();
    for (entries, failures, has_book) in per_game {
        if !has_book {
            extraction.games_without_baseline += 1;
        }
        for (game_id, market, found) in entries {
            extraction.index.insert(&game_id, &market, found);
        }
        extraction.failures.extend(failures);
    }
    extraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bookmaker;
    use crate::pricing::vig::KeywordBaseline;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn fair_total(baseline: &MarketBaseline) -> Decimal {
        baseline.outcomes.iter().map(|o| o.fair_probability).sum()
    }

    fn game(id: &str, books: Vec<Bookmaker>) -> Game {
        Game {
            id: id.into(),
            sport_key: "basketball_nba".into(),
            sport_title: "NBA".into(),
            commence_time: "2024-01-15T00:10:00Z".parse().unwrap(),
            home_team: "Home".into(),
            away_team: "Away".into(),
            bookmakers: books,
        }
    }

    fn bookmaker(key: &str, markets: Vec<BookMarket>) -> Bookmaker {
        Bookmaker {
            key: key.into(),
            title: key.into(),
            markets,
        }
    }

    #[test]
    fn test_extract_baseline_per_market() {
        let games = vec![
            game(
                "g1",
                vec![bookmaker(
                    "pinnacle",
                    vec![BookMarket {
                        key: "h2h".into(),
                        outcomes: vec![
                            OutcomeQuote::new("Home", -105),
                            OutcomeQuote::new("Away", -105),
                        ],
                    }],
                )],
            ),
            game(
                "g2",
                vec![bookmaker(
                    "fanduel",
                    vec![BookMarket {
                        key: "h2h".into(),
                        outcomes: vec![
                            OutcomeQuote::new("Home", -110),
                            OutcomeQuote::new("Away", -110),
                        ],
                    }],
                )],
            ),
        ];

        let extraction = extract_baseline(&games, &KeywordBaseline::default());
        assert_eq!(extraction.index.len(), 1);
        assert_eq!(extraction.games_without_baseline, 1);
        assert!(extraction.failures.is_empty());

        let found = extraction.index.get("g1", "h2h").unwrap();
        assert_eq!(found.book, "pinnacle");
        assert!((fair_total(found) - Decimal::ONE).abs() <= dec!(0.000000001));
        assert!(extraction.index.get("g2", "h2h").is_none());
    }

    #[test]
    fn test_player_props_devig_per_player() {
        let market = BookMarket {
            key: "player_points".into(),
            outcomes: vec![
                OutcomeQuote::new("Over", -110).with_point(dec!(25.5)).with_description("A"),
                OutcomeQuote::new("Under", -110).with_point(dec!(25.5)).with_description("A"),
                OutcomeQuote::new("Over", 120).with_point(dec!(8.5)).with_description("B"),
                OutcomeQuote::new("Under", -150).with_point(dec!(8.5)).with_description("B"),
            ],
        };
        let games = vec![game("g1", vec![bookmaker("pinnacle", vec![market])])];

        let extraction = extract_baseline(&games, &KeywordBaseline::default());
        let found = extraction.index.get("g1", "player_points").unwrap();
        assert_eq!(found.outcomes.len(), 4);

        let a_over = found
            .outcomes
            .iter()
            .find(|o| o.description.as_deref() == Some("A") && o.name == "Over")
            .unwrap();
        assert_eq!(a_over.fair_probability.round_dp(12), dec!(0.5));
        // two groups, each summing to one
        assert!((fair_total(found) - dec!(2)).abs() <= dec!(0.000000001));
    }

    #[test]
    fn test_bad_baseline_market_is_reported() {
        let games = vec![game(
            "g1",
            vec![bookmaker(
                "pinnacle",
                vec![
                    BookMarket {
                        key: "h2h".into(),
                        outcomes: vec![
                            OutcomeQuote::new("Home", 0),
                            OutcomeQuote::new("Away", -105),
                        ],
                    },
                    BookMarket {
                        key: "totals".into(),
                        outcomes: vec![
                            OutcomeQuote::new("Over", -105).with_point(dec!(220.5)),
                            OutcomeQuote::new("Under", -105).with_point(dec!(220.5)),
                        ],
                    },
                ],
            )],
        )];

        let extraction = extract_baseline(&games, &KeywordBaseline::default());
        assert_eq!(extraction.failures.len(), 1);
        assert_eq!(extraction.failures[0].error, "invalid_odds");
        assert!(extraction.index.get("g1", "h2h").is_none());
        assert!(extraction.index.get("g1", "totals").is_some());
    }

    #[test]
    fn test_one_sided_prop_group_has_no_baseline() {
        let market = BookMarket {
            key: "player_points".into(),
            outcomes: vec![
                OutcomeQuote::new("Over", -400).with_point(dec!(25.5)).with_description("A"),
                OutcomeQuote::new("Over", -110).with_point(dec!(8.5)).with_description("B"),
                OutcomeQuote::new("Under", -110).with_point(dec!(8.5)).with_description("B"),
            ],
        };
        let games = vec![game("g1", vec![bookmaker("pinnacle", vec![market])])];

        let extraction = extract_baseline(&games, &KeywordBaseline::default());
        assert_eq!(extraction.failures.len(), 1);
        assert_eq!(extraction.failures[0].error, "invalid_market");
        assert!(extraction.failures[0].message.contains("one-sided"));

        let found = extraction.index.get("g1", "player_points").unwrap();
        assert_eq!(found.outcomes.len(), 2);
        assert!(found
            .outcomes
            .iter()
            .all(|o| o.description.as_deref() == Some("B")));
        assert!(found.outcomes.iter().all(|o| o.fair_probability < Decimal::ONE));
    }

    #[test]
    fn test_prop_sides_on_different_lines_are_not_paired() {
        let market = BookMarket {
            key: "player_rebounds".into(),
            outcomes: vec![
                OutcomeQuote::new("Over", -110).with_point(dec!(9.5)).with_description("A"),
                OutcomeQuote::new("Under", -110).with_point(dec!(10.5)).with_description("A"),
            ],
        };
        let games = vec![game("g1", vec![bookmaker("pinnacle", vec![market])])];

        let extraction = extract_baseline(&games, &KeywordBaseline::default());
        assert_eq!(extraction.failures.len(), 2);
        assert!(extraction.index.get("g1", "player_rebounds").is_none());
    }

    #[test]
    fn test_player_name_case_variants_share_a_group() {
        let market = BookMarket {
            key: "player_points".into(),
            outcomes: vec![
                OutcomeQuote::new("Over", 120)
                    .with_point(dec!(25.5))
                    .with_description("LeBron James"),
                OutcomeQuote::new("Under", -150)
                    .with_point(dec!(25.5))
                    .with_description("lebron james"),
            ],
        };
        let games = vec![game("g1", vec![bookmaker("pinnacle", vec![market])])];

        let extraction = extract_baseline(&games, &KeywordBaseline::default());
        assert!(extraction.failures.is_empty());
        let found = extraction.index.get("g1", "player_points").unwrap();
        assert_eq!(found.outcomes.len(), 2);
        assert!((fair_total(found) - Decimal::ONE).abs() <= dec!(0.000000001));
    }
}
