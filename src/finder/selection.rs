//! Greedy parlay assembly over EV-ranked bets
//!
//! Runs as one sequential pass: the used-selection, used-game and
//! used-player sets are shared across every pick.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::domain::Odds;
use crate::error::Result;
use crate::finder::bet::Bet;
use crate::finder::matching::normalize_name;
use crate::pricing::ev::{single_outcome_ev, Confidence};
use crate::pricing::parlay::{calculate_parlay, ParlayAnalysis, ParlayLeg};
use crate::validation::validate_stake;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParlayOptions {
    pub legs: usize,
    #[serde(default)]
    pub require_player_props: bool,
    pub player_props_ratio: Decimal,
    /// Stake for the payout projection; metrics are always per unit
    pub stake: Decimal,
}

impl Default for ParlayOptions {
    fn default() -> Self {
        let config = crate::config::ParlayConfig::default();
        Self::from(&config)
    }
}

impl From<&crate::config::ParlayConfig> for ParlayOptions {
    fn from(config: &crate::config::ParlayConfig) -> Self {
        Self {
            legs: config.legs,
            require_player_props: config.require_player_props,
            player_props_ratio: config.player_props_ratio,
            stake: config.stake,
        }
    }
}

impl ParlayOptions {
    /// Prop legs to pick first on the props path
    pub fn prop_target(&self) -> usize {
        let target = (Decimal::from(self.legs as u64) * self.player_props_ratio)
            .ceil()
            .to_usize()
            .unwrap_or(self.legs);
        target.min(self.legs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParlayMetrics {
    pub combined_odds: Decimal,
    pub combined_probability: Decimal,
    /// Per unit staked
    pub expected_value: Decimal,
    pub edge_percentage: Decimal,
    pub confidence: Confidence,
}

/// Parlay picked from ranked bets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledParlay {
    pub legs: Vec<Bet>,
    pub requested_legs: usize,
    /// None when no leg could be selected
    pub metrics: Option<ParlayMetrics>,
    /// Full breakdown at the configured stake
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ParlayAnalysis>,
    pub has_estimated_legs: bool,
    /// Candidates passed over because they had no true probability
    pub skipped_without_probability: usize,
}

impl AssembledParlay {
    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }

    pub fn is_complete(&self) -> bool {
        self.legs.len() >= self.requested_legs
    }
}

#[derive(Default)]
struct SelectionState {
    selections: HashSet<(String, String, String)>,
    main_games: HashSet<String>,
    prop_games: HashSet<String>,
    prop_players: HashSet<(String, String, String)>,
    picked: Vec<Bet>,
}

impl SelectionState {
    fn selection_key(bet: &Bet) -> (String, String, String) {
        (bet.game_id.clone(), bet.market.clone(), bet.selection_key())
    }

    fn player_key(bet: &Bet) -> (String, String, String) {
        (bet.game_id.clone(), normalize_name(bet.player()), bet.market.clone())
    }

    /// Try to take a bet. `exclude_prop_games` keeps main legs off games
    /// already covered by props.
    fn try_add(&mut self, bet: &Bet, exclude_prop_games: bool) -> bool {
        if self.selections.contains(&Self::selection_key(bet)) {
            return false;
        }

        if bet.is_player_prop() {
            let player = Self::player_key(bet);
            if self.prop_players.contains(&player) {
                return false;
            }
            self.prop_players.insert(player);
            self.prop_games.insert(bet.game_id.clone());
        } else {
            if self.main_games.contains(&bet.game_id) {
                return false;
            }
            if exclude_prop_games && self.prop_games.contains(&bet.game_id) {
                return false;
            }
            self.main_games.insert(bet.game_id.clone());
        }

        self.selections.insert(Self::selection_key(bet));
        self.picked.push(bet.clone());
        true
    }
}

fn to_leg(bet: &Bet) -> Result<ParlayLeg> {
    let odds = Odds::decimal(bet.decimal_odds)?;
    let mut leg = ParlayLeg::new(bet.book.clone(), odds, bet.true_probability)
        .with_label(format!("{} {}", bet.matchup(), bet.label()));
    if let Some(source) = bet.probability_source {
        leg = leg.with_source(source);
    }
    Ok(leg)
}

/// Greedily assemble a diversified parlay from bets
///
/// Bets are walked in descending EV order (stable for ties). Bets without a
/// true probability are skipped and counted. Returns fewer legs than
/// requested when the pool runs out.
pub fn build_optimal_parlay(bets: &[Bet], options: &ParlayOptions) -> Result<AssembledParlay> {
    crate::validation::validate_finder_options(1, options.legs, options.player_props_ratio)?;
    validate_stake(options.stake)?;

    let mut skipped_without_probability = 0;
    let mut ranked: Vec<&Bet> = Vec::with_capacity(bets.len());
    for bet in bets {
        if bet.true_probability.is_some() {
            ranked.push(bet);
        } else {
            skipped_without_probability += 1;
        }
    }
    ranked.sort_by(|a, b| b.expected_value.cmp(&a.expected_value));

    let mut state = SelectionState::default();

    if options.require_player_props {
        let prop_target = options.prop_target();
        for bet in ranked.iter().filter(|b| b.is_player_prop()) {
            if state.picked.len() >= prop_target {
                break;
            }
            state.try_add(bet, false);
        }
        debug!(props = state.picked.len(), target = prop_target, "prop legs selected");

        for bet in ranked.iter().filter(|b| !b.is_player_prop()) {
            if state.picked.len() >= options.legs {
                break;
            }
            state.try_add(bet, true);
        }
    } else {
        for bet in &ranked {
            if state.picked.len() >= options.legs {
                break;
            }
            state.try_add(bet, false);
        }
    }

    let legs = state.picked;
    let has_estimated_legs = legs.iter().any(|b| {
        !b.has_baseline || b.probability_source.is_some_and(|s| s.is_estimate())
    });

    if legs.is_empty() {
        info!(requested = options.legs, "no parlay legs available");
        return Ok(AssembledParlay {
            legs,
            requested_legs: options.legs,
            metrics: None,
            analysis: None,
            has_estimated_legs: false,
            skipped_without_probability,
        });
    }

    let parlay_legs = legs.iter().map(to_leg).collect::<Result<Vec<_>>>()?;
    let unit = calculate_parlay(&parlay_legs, Decimal::ONE)?;
    let unit_ev = single_outcome_ev(unit.combined_true_probability, unit.combined_odds);

    let mut confidence = Confidence::from_ev(unit_ev);
    if has_estimated_legs && confidence > Confidence::Low {
        confidence = Confidence::Low;
    }

    let metrics = ParlayMetrics {
        combined_odds: unit.combined_odds,
        combined_probability: unit.combined_true_probability,
        expected_value: unit_ev,
        edge_percentage: unit.edge_percentage,
        confidence,
    };

    let analysis = if options.stake == Decimal::ONE {
        unit
    } else {
        calculate_parlay(&parlay_legs, options.stake)?
    };

    info!(
        legs = legs.len(),
        requested = options.legs,
        combined_odds = %metrics.combined_odds,
        ev = %metrics.expected_value,
        confidence = %metrics.confidence,
        "parlay assembled"
    );

    Ok(AssembledParlay {
        legs,
        requested_legs: options.legs,
        metrics: Some(metrics),
        analysis: Some(analysis),
        has_estimated_legs,
        skipped_without_probability,
    })
}
