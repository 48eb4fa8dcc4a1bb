//! Parlay engine
//!
//! Combines legs into parlay odds, probability, EV and payout. Legs are treated
//! as independent: correlated legs (same game, same team) overstate the
//! combined probability and nothing here corrects for it.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Odds, OddsFormat, OddsValue};
use crate::error::{ErrorReport, Result, SharplineError};
use crate::pricing::ev::{edge_percentage, single_outcome_ev, ProbabilitySource};
use crate::pricing::odds::{decimal_to_american, implied_probability};
use crate::validation::validate_parlay_request;

fn default_stake() -> Decimal {
    dec!(100)
}

/// A leg as submitted at the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParlayLegInput {
    pub book: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub odds: OddsValue,
    pub format: OddsFormat,
    #[serde(default)]
    pub is_push: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_probability: Option<Decimal>,
}

impl ParlayLegInput {
    pub fn into_leg(&self) -> Result<ParlayLeg> {
        let odds = self.odds.to_odds(self.format, self.is_push)?;
        Ok(ParlayLeg {
            book: self.book.clone(),
            label: self.label.clone(),
            odds,
            is_push: self.is_push,
            true_probability: self.true_probability,
            probability_source: self.true_probability.map(|_| ProbabilitySource::Provided),
        })
    }
}

/// A parsed leg ready for combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParlayLeg {
    pub book: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub odds: Odds,
    pub is_push: bool,
    pub true_probability: Option<Decimal>,
    /// Where `true_probability` came from, when it is set
    pub probability_source: Option<ProbabilitySource>,
}

impl ParlayLeg {
    pub fn new(book: impl Into<String>, odds: Odds, true_probability: Option<Decimal>) -> Self {
        Self {
            book: book.into(),
            label: None,
            odds,
            is_push: false,
            true_probability,
            probability_source: true_probability.map(|_| ProbabilitySource::Provided),
        }
    }

    pub fn push(book: impl Into<String>) -> Self {
        Self {
            book: book.into(),
            label: None,
            odds: Odds::push(),
            is_push: true,
            true_probability: None,
            probability_source: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_source(mut self, source: ProbabilitySource) -> Self {
        self.probability_source = Some(source);
        self
    }
}

/// A parlay as submitted at the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParlayRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub legs: Vec<ParlayLegInput>,
    #[serde(default = "default_stake")]
    pub stake: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushInfo {
    pub has_pushes: bool,
    pub push_count: usize,
    pub active_leg_count: usize,
}

/// How one leg entered the products
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParlayLegResult {
    pub book: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub is_push: bool,
    pub decimal_odds: Decimal,
    pub true_probability: Decimal,
    pub probability_source: ProbabilitySource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParlayAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub stake: Decimal,
    pub combined_odds: Decimal,
    /// None when every leg pushed
    pub combined_american_odds: Option<Decimal>,
    pub combined_true_probability: Decimal,
    pub projected_payout: Decimal,
    pub profit: Decimal,
    pub expected_value: Decimal,
    pub edge_percentage: Decimal,
    pub is_value_bet: bool,
    /// Some leg had no true probability and used its implied probability
    pub has_estimated_legs: bool,
    pub push_info: PushInfo,
    pub legs: Vec<ParlayLegResult>,
}

fn leg_error(index: usize, err: impl std::fmt::Display) -> SharplineError {
    SharplineError::Parlay(format!("leg {}: {}", index, err))
}

/// Combine legs at the given stake. Any invalid leg fails the whole parlay.
pub fn calculate_parlay(legs: &[ParlayLeg], stake: Decimal) -> Result<ParlayAnalysis> {
    let probabilities: Vec<Option<Decimal>> = legs.iter().map(|l| l.true_probability).collect();
    validate_parlay_request(legs.len(), stake, &probabilities)?;

    let mut combined_odds = Decimal::ONE;
    let mut combined_probability = Decimal::ONE;
    let mut results = Vec::with_capacity(legs.len());

    for (i, leg) in legs.iter().enumerate() {
        if leg.is_push {
            // Still require a well-formed quote so a bad record never slips through
            leg.odds.to_decimal().map_err(|e| leg_error(i, e))?;
            results.push(ParlayLegResult {
                book: leg.book.clone(),
                label: leg.label.clone(),
                is_push: true,
                decimal_odds: Decimal::ONE,
                true_probability: Decimal::ONE,
                probability_source: ProbabilitySource::Push,
            });
            continue;
        }

        let decimal = leg.odds.to_decimal().map_err(|e| leg_error(i, e))?;
        if decimal <= Decimal::ONE {
            return Err(leg_error(
                i,
                format!("decimal odds must exceed 1.0 unless the leg pushed, got {}", decimal),
            ));
        }

        let (probability, source) = match leg.true_probability {
            Some(p) => (p, leg.probability_source.unwrap_or(ProbabilitySource::Provided)),
            None => (
                implied_probability(decimal).map_err(|e| leg_error(i, e))?,
                ProbabilitySource::Implied,
            ),
        };

        combined_odds = combined_odds
            .checked_mul(decimal)
            .ok_or_else(|| leg_error(i, "combined odds overflow"))?;
        combined_probability = combined_probability
            .checked_mul(probability)
            .ok_or_else(|| leg_error(i, "combined probability overflow"))?;

        results.push(ParlayLegResult {
            book: leg.book.clone(),
            label: leg.label.clone(),
            is_push: false,
            decimal_odds: decimal,
            true_probability: probability,
            probability_source: source,
        });
    }

    let push_count = results.iter().filter(|r| r.is_push).count();
    let push_info = PushInfo {
        has_pushes: push_count > 0,
        push_count,
        active_leg_count: results.len() - push_count,
    };
    let has_estimated_legs = results
        .iter()
        .any(|r| r.probability_source == ProbabilitySource::Implied);

    if push_info.active_leg_count == 0 {
        return Ok(ParlayAnalysis {
            label: None,
            stake,
            combined_odds: Decimal::ONE,
            combined_american_odds: None,
            combined_true_probability: Decimal::ONE,
            projected_payout: stake,
            profit: Decimal::ZERO,
            expected_value: Decimal::ZERO,
            edge_percentage: Decimal::ZERO,
            is_value_bet: false,
            has_estimated_legs: false,
            push_info,
            legs: results,
        });
    }

    let unit_ev = single_outcome_ev(combined_probability, combined_odds);
    let expected_value = stake * unit_ev;

    debug!(
        legs = results.len(),
        pushes = push_count,
        combined_odds = %combined_odds,
        ev = %expected_value,
        "parlay calculated"
    );

    Ok(ParlayAnalysis {
        label: None,
        stake,
        combined_odds,
        combined_american_odds: if combined_odds > Decimal::ONE {
            Some(decimal_to_american(combined_odds)?)
        } else {
            None
        },
        combined_true_probability: combined_probability,
        projected_payout: stake * combined_odds,
        profit: stake * (combined_odds - Decimal::ONE),
        expected_value,
        edge_percentage: edge_percentage(unit_ev),
        is_value_bet: unit_ev > Decimal::ZERO,
        has_estimated_legs,
        push_info,
        legs: results,
    })
}

/// Parse and combine a submitted parlay
pub fn evaluate_request(request: &ParlayRequest) -> Result<ParlayAnalysis> {
    let legs = request
        .legs
        .iter()
        .enumerate()
        .map(|(i, leg)| leg.into_leg().map_err(|e| leg_error(i, e)))
        .collect::<Result<Vec<_>>>()?;
    let mut analysis = calculate_parlay(&legs, request.stake)?;
    analysis.label = request.label.clone();
    Ok(analysis)
}

/// Parlay identified by position in the compared list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedParlay {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub expected_value: Decimal,
    pub projected_payout: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParlayComparisonEntry {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ParlayAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

/// Best-EV and highest-payout are reported separately; they are often different parlays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParlayComparison {
    pub parlays: Vec<ParlayComparisonEntry>,
    /// Valid parlays, highest EV first
    pub ranked: Vec<RankedParlay>,
    /// Highest EV among value bets
    pub best_value: Option<RankedParlay>,
    /// Highest projected payout regardless of EV
    pub highest_payout: Option<RankedParlay>,
    pub failed: usize,
}

pub fn compare_parlays(requests: &[ParlayRequest]) -> ParlayComparison {
    let parlays: Vec<ParlayComparisonEntry> = requests
        .iter()
        .enumerate()
        .map(|(index, request)| match evaluate_request(request) {
            Ok(analysis) => ParlayComparisonEntry {
                index,
                analysis: Some(analysis),
                error: None,
            },
            Err(e) => ParlayComparisonEntry {
                index,
                analysis: None,
                error: Some(e.report()),
            },
        })
        .collect();

    let valid: Vec<(&ParlayAnalysis, RankedParlay)> = parlays
        .iter()
        .filter_map(|entry| {
            entry.analysis.as_ref().map(|a| {
                (
                    a,
                    RankedParlay {
                        index: entry.index,
                        label: a.label.clone(),
                        expected_value: a.expected_value,
                        projected_payout: a.projected_payout,
                    },
                )
            })
        })
        .collect();

    let mut ranked: Vec<RankedParlay> = valid.iter().map(|(_, r)| r.clone()).collect();
    ranked.sort_by(|a, b| b.expected_value.cmp(&a.expected_value));

    let best_value = valid
        .iter()
        .filter(|(a, _)| a.is_value_bet)
        .max_by(|(a, _), (b, _)| a.expected_value.cmp(&b.expected_value))
        .map(|(_, r)| r.clone());
    let highest_payout = valid
        .iter()
        .max_by(|(a, _), (b, _)| a.projected_payout.cmp(&b.projected_payout))
        .map(|(_, r)| r.clone());

    ParlayComparison {
        failed: parlays.iter().filter(|p| p.error.is_some()).count(),
        parlays,
        ranked,
        best_value,
        highest_payout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(odds: Decimal, p: Decimal) -> ParlayLeg {
        ParlayLeg::new("book", Odds::Decimal(odds), Some(p))
    }

    fn input(odds: &str, format: OddsFormat, p: Option<Decimal>) -> ParlayLegInput {
        ParlayLegInput {
            book: "draftkings".into(),
            label: None,
            odds: OddsValue::Text(odds.into()),
            format,
            is_push: false,
            true_probability: p,
        }
    }

    #[test]
    fn test_two_leg_parlay() {
        let analysis =
            calculate_parlay(&[leg(dec!(2.00), dec!(0.49)), leg(dec!(1.9091), dec!(0.50))], dec!(1))
                .unwrap();

        assert_eq!(analysis.combined_odds, dec!(3.8182));
        assert_eq!(analysis.combined_true_probability, dec!(0.245));
        // 0.245 * 2.8182 - 0.755
        assert_eq!(analysis.expected_value, dec!(-0.064541));
        assert!(!analysis.is_value_bet);
        assert_eq!(analysis.profit, dec!(2.8182));
        assert_eq!(analysis.push_info.active_leg_count, 2);
    }

    #[test]
    fn test_stake_scales_money_not_edge() {
        let legs = [leg(dec!(2.5), dec!(0.45)), leg(dec!(2.2), dec!(0.5))];
        let unit = calculate_parlay(&legs, dec!(1)).unwrap();
        let hundred = calculate_parlay(&legs, dec!(100)).unwrap();

        assert_eq!(hundred.expected_value, unit.expected_value * dec!(100));
        assert_eq!(hundred.projected_payout, dec!(550));
        assert_eq!(hundred.edge_percentage, unit.edge_percentage);
        // 0.225 * 5.5 - 1 = 0.2375
        assert_eq!(unit.expected_value, dec!(0.2375));
        assert!(unit.is_value_bet);
    }

    #[test]
    fn test_push_leg_is_neutral() {
        let with_push = calculate_parlay(
            &[leg(dec!(2.5), dec!(0.45)), ParlayLeg::push("fanduel")],
            dec!(10),
        )
        .unwrap();
        let single = calculate_parlay(&[leg(dec!(2.5), dec!(0.45))], dec!(10)).unwrap();

        assert_eq!(with_push.combined_odds, single.combined_odds);
        assert_eq!(with_push.expected_value, single.expected_value);
        assert_eq!(with_push.legs.len(), 2);
        assert!(with_push.push_info.has_pushes);
        assert_eq!(with_push.push_info.push_count, 1);
        assert_eq!(with_push.push_info.active_leg_count, 1);
    }

    #[test]
    fn test_all_push_parlay_returns_stake() {
        for count in 1..=4 {
            let legs: Vec<ParlayLeg> = (0..count).map(|_| ParlayLeg::push("book")).collect();
            let analysis = calculate_parlay(&legs, dec!(25)).unwrap();

            assert_eq!(analysis.projected_payout, dec!(25));
            assert_eq!(analysis.profit, Decimal::ZERO);
            assert_eq!(analysis.expected_value, Decimal::ZERO);
            assert_eq!(analysis.combined_american_odds, None);
            assert_eq!(analysis.push_info.push_count, count);
            assert_eq!(analysis.push_info.active_leg_count, 0);
        }
    }

    #[test]
    fn test_missing_probability_uses_implied_and_is_labeled() {
        let analysis = calculate_parlay(
            &[ParlayLeg::new("book", Odds::Decimal(dec!(2)), None)],
            dec!(1),
        )
        .unwrap();

        assert!(analysis.has_estimated_legs);
        assert_eq!(analysis.legs[0].probability_source, ProbabilitySource::Implied);
        assert_eq!(analysis.combined_true_probability, dec!(0.5));
        assert_eq!(analysis.expected_value, Decimal::ZERO);
    }

    #[test]
    fn test_invalid_leg_aborts_parlay() {
        let err = calculate_parlay(
            &[leg(dec!(2.5), dec!(0.45)), leg(Decimal::ONE, dec!(0.5))],
            dec!(1),
        )
        .unwrap_err();
        assert!(err.to_string().contains("leg 1"));

        assert!(calculate_parlay(&[], dec!(1)).is_err());
        assert!(calculate_parlay(&[leg(dec!(2.5), dec!(0.45))], dec!(0)).is_err());
    }

    #[test]
    fn test_evaluate_request_parses_inputs() {
        let request = ParlayRequest {
            label: Some("sunday".into()),
            legs: vec![
                input("+150", OddsFormat::American, Some(dec!(0.45))),
                input("1.90", OddsFormat::Decimal, Some(dec!(0.55))),
            ],
            stake: dec!(10),
        };
        let analysis = evaluate_request(&request).unwrap();
        assert_eq!(analysis.label.as_deref(), Some("sunday"));
        assert_eq!(analysis.combined_odds, dec!(4.75));

        let bad = ParlayRequest {
            label: None,
            legs: vec![
                input("+150", OddsFormat::American, None),
                input("zero", OddsFormat::Decimal, None),
            ],
            stake: dec!(10),
        };
        assert!(evaluate_request(&bad).is_err());
    }

    #[test]
    fn test_request_deserialize_defaults() {
        let json = r#"{"legs": [{"book": "fanduel", "odds": -110, "format": "american"}]}"#;
        let request: ParlayRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.stake, dec!(100));
        assert!(!request.legs[0].is_push);

        let auto = r#"{"legs": [{"book": "fanduel", "odds": -110, "format": "auto"}]}"#;
        assert!(serde_json::from_str::<ParlayRequest>(auto).is_err());
    }

    #[test]
    fn test_compare_parlays_reports_both_bests() {
        let value = ParlayRequest {
            label: Some("value".into()),
            legs: vec![
                input("2.2", OddsFormat::Decimal, Some(dec!(0.5))),
                input("2.2", OddsFormat::Decimal, Some(dec!(0.5))),
            ],
            stake: dec!(10),
        };
        let longshot = ParlayRequest {
            label: Some("longshot".into()),
            legs: vec![
                input("+400", OddsFormat::American, Some(dec!(0.15))),
                input("+400", OddsFormat::American, Some(dec!(0.15))),
            ],
            stake: dec!(10),
        };
        let broken = ParlayRequest {
            label: Some("broken".into()),
            legs: vec![input("0", OddsFormat::American, None)],
            stake: dec!(10),
        };

        let comparison = compare_parlays(&[value, longshot, broken]);

        assert_eq!(comparison.failed, 1);
        assert_eq!(comparison.ranked.len(), 2);
        assert_eq!(comparison.best_value.as_ref().unwrap().label.as_deref(), Some("value"));
        assert_eq!(
            comparison.highest_payout.as_ref().unwrap().label.as_deref(),
            Some("longshot")
        );
        assert!(comparison.parlays[2].error.is_some());
    }

    #[test]
    fn test_compare_without_value_bets() {
        let request = ParlayRequest {
            label: None,
            legs: vec![input("-110", OddsFormat::American, Some(dec!(0.5)))],
            stake: dec!(10),
        };
        let comparison = compare_parlays(&[request]);
        assert!(comparison.best_value.is_none());
        assert_eq!(comparison.highest_payout.unwrap().index, 0);
    }
}
