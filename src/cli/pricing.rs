//! `sharpline convert | devig | ev | market | parlay`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tabled::Tabled;

use super::output::{self, american, num, pct, OutputMode};
use crate::config::AppConfig;
use crate::domain::{MarketSubmission, OddsFormat, OddsValue, OutcomeQuote};
use crate::finder::MatcherChain;
use crate::pricing::ev::{process_outcome, BookOutcome, EvCalculator, MarketReport};
use crate::pricing::odds::{fair_decimal_odds, implied_probability};
use crate::pricing::parlay::{compare_parlays, evaluate_request, ParlayAnalysis, ParlayRequest};
use crate::pricing::vig::{overround, remove_vig, vig_percentage, KeywordBaseline};

#[derive(Debug, Serialize, Tabled)]
struct ConversionRow {
    american: String,
    decimal: String,
    implied: String,
}

pub fn convert(odds: &str, format: OddsFormat, mode: OutputMode) -> anyhow::Result<()> {
    let odds = OddsValue::Text(odds.to_string()).to_odds(format, false)?;
    let decimal = odds.to_decimal()?;
    let row = ConversionRow {
        american: american(odds.to_american()?),
        decimal: num(decimal),
        implied: pct(implied_probability(decimal)?),
    };
    output::print_items(&[row], mode)
}

#[derive(Debug, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
struct DevigRow {
    price: String,
    decimal: String,
    implied: String,
    fair: String,
    fair_decimal: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DevigResult {
    overround: Decimal,
    vig_percentage: Decimal,
    fair_probabilities: Vec<Decimal>,
}

pub fn devig(prices: &[String], mode: OutputMode) -> anyhow::Result<()> {
    let decimals = prices
        .iter()
        .map(|p| {
            OddsValue::Text(p.clone())
                .to_odds(OddsFormat::American, false)?
                .to_decimal()
        })
        .collect::<crate::error::Result<Vec<_>>>()?;
    let implied = decimals
        .iter()
        .map(|d| implied_probability(*d))
        .collect::<crate::error::Result<Vec<_>>>()?;
    let fair = remove_vig(&implied)?;

    if mode == OutputMode::Json {
        return output::print_json(&DevigResult {
            overround: overround(&implied),
            vig_percentage: vig_percentage(&implied),
            fair_probabilities: fair,
        });
    }

    let rows: Vec<DevigRow> = prices
        .iter()
        .zip(decimals.iter().zip(implied.iter().zip(fair.iter())))
        .map(|(price, (d, (i, f)))| DevigRow {
            price: price.clone(),
            decimal: num(*d),
            implied: pct(*i),
            fair: pct(*f),
            fair_decimal: fair_decimal_odds(*f)
                .map(num)
                .unwrap_or_else(|_| "-".to_string()),
        })
        .collect();
    output::print_items(&rows, mode)?;
    output::print_kv("overround", num(overround(&implied)));
    output::print_kv("vig", pct(vig_percentage(&implied)));
    Ok(())
}

#[derive(Debug, Serialize, Tabled)]
struct EvRow {
    odds: String,
    decimal: String,
    implied: String,
    #[tabled(rename = "true")]
    true_probability: String,
    ev: String,
    edge: String,
    kelly: String,
    value: bool,
}

pub fn ev(
    odds: &str,
    format: OddsFormat,
    probability: Decimal,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let odds = OddsValue::Text(odds.to_string()).to_odds(format, false)?;
    let analysis = process_outcome(&odds, probability)?;

    if mode == OutputMode::Json {
        return output::print_json(&analysis);
    }

    let row = EvRow {
        odds: odds.to_string(),
        decimal: num(analysis.raw_odds.decimal),
        implied: pct(analysis.implied_probability),
        true_probability: pct(analysis.true_probability),
        ev: num(analysis.expected_value),
        edge: format!("{}%", analysis.edge_percentage.round_dp(2)),
        kelly: pct(analysis.kelly_fraction),
        value: analysis.is_value_bet,
    };
    output::print_items(&[row], mode)
}

#[derive(Debug, Serialize, Tabled)]
struct BookOutcomeRow {
    book: String,
    outcome: String,
    odds: String,
    implied: String,
    fair: String,
    ev: String,
    value: bool,
}

impl From<&BookOutcome> for BookOutcomeRow {
    fn from(o: &BookOutcome) -> Self {
        let quote = OutcomeQuote {
            name: o.name.clone(),
            price: o.analysis.raw_odds.american,
            point: o.point,
            description: o.description.clone(),
        };
        Self {
            book: o.book.clone(),
            outcome: quote.label(),
            odds: american(o.analysis.raw_odds.american),
            implied: pct(o.analysis.implied_probability),
            fair: pct(o.analysis.true_probability),
            ev: num(o.analysis.expected_value),
            value: o.analysis.is_value_bet,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MarketFile {
    One(MarketSubmission),
    Many(Vec<MarketSubmission>),
}

pub fn market(file: &Path, config: &AppConfig, mode: OutputMode) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)?;
    let submissions = match serde_json::from_str::<MarketFile>(&raw)? {
        MarketFile::One(s) => vec![s],
        MarketFile::Many(s) => s,
    };

    let calculator = EvCalculator::new(
        Arc::new(KeywordBaseline::new(config.baseline.books.iter())),
        Arc::new(MatcherChain::default()),
    );
    let reports = calculator.process_markets(&submissions);

    if mode == OutputMode::Json {
        return output::print_json(&reports);
    }

    for report in &reports {
        print_market_report(report, mode)?;
    }
    Ok(())
}

fn print_market_report(report: &MarketReport, mode: OutputMode) -> anyhow::Result<()> {
    let title = match &report.game {
        Some(game) => format!("{} ({})", report.market, game),
        None => report.market.clone(),
    };
    println!("== {title}");

    if let Some(error) = &report.error {
        output::print_error(&format!("{}: {}", error.error, error.message));
        return Ok(());
    }
    let Some(analysis) = &report.analysis else {
        return Ok(());
    };

    let rows: Vec<BookOutcomeRow> = analysis.outcomes.iter().map(BookOutcomeRow::from).collect();
    output::print_items(&rows, mode)?;
    for (book, vig) in &analysis.market_vig {
        output::print_kv(&format!("vig[{book}]"), pct(vig.vig_percentage));
    }
    match &analysis.best_value_bet {
        Some(best) => output::print_kv(
            "best value",
            format!(
                "{} {} @ {} (EV {})",
                best.book,
                best.name,
                american(best.analysis.raw_odds.american),
                num(best.analysis.expected_value)
            ),
        ),
        None => output::print_warn("no value bets in this market"),
    }
    Ok(())
}

#[derive(Debug, Serialize, Tabled)]
pub(crate) struct ParlaySummaryRow {
    pub(crate) parlay: String,
    pub(crate) legs: usize,
    pub(crate) pushes: usize,
    pub(crate) odds: String,
    pub(crate) probability: String,
    pub(crate) payout: String,
    pub(crate) ev: String,
    pub(crate) value: bool,
}

impl ParlaySummaryRow {
    pub(crate) fn new(name: String, a: &ParlayAnalysis) -> Self {
        Self {
            parlay: name,
            legs: a.legs.len(),
            pushes: a.push_info.push_count,
            odds: num(a.combined_odds),
            probability: pct(a.combined_true_probability),
            payout: num(a.projected_payout),
            ev: num(a.expected_value),
            value: a.is_value_bet,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParlayFile {
    One(ParlayRequest),
    Many(Vec<ParlayRequest>),
}

pub fn parlay(file: &Path, stake: Option<Decimal>, mode: OutputMode) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)?;
    let parsed: ParlayFile = serde_json::from_str(&raw)?;

    match parsed {
        ParlayFile::One(mut request) => {
            if let Some(stake) = stake {
                request.stake = stake;
            }
            let analysis = evaluate_request(&request)?;
            if mode == OutputMode::Json {
                return output::print_json(&analysis);
            }
            let name = analysis.label.clone().unwrap_or_else(|| "parlay".to_string());
            output::print_items(&[ParlaySummaryRow::new(name, &analysis)], mode)?;
            if analysis.has_estimated_legs {
                output::print_warn("some legs had no true probability; implied probability used");
            }
            Ok(())
        }
        ParlayFile::Many(mut requests) => {
            if let Some(stake) = stake {
                for request in &mut requests {
                    request.stake = stake;
                }
            }
            let comparison = compare_parlays(&requests);
            if mode == OutputMode::Json {
                return output::print_json(&comparison);
            }

            let rows: Vec<ParlaySummaryRow> = comparison
                .parlays
                .iter()
                .filter_map(|entry| {
                    entry.analysis.as_ref().map(|a| {
                        let name = a.label.clone().unwrap_or_else(|| format!("#{}", entry.index));
                        ParlaySummaryRow::new(name, a)
                    })
                })
                .collect();
            output::print_items(&rows, mode)?;

            for entry in comparison.parlays.iter().filter(|e| e.error.is_some()) {
                if let Some(error) = &entry.error {
                    output::print_error(&format!("#{}: {}", entry.index, error.message));
                }
            }
            match &comparison.best_value {
                Some(best) => output::print_kv(
                    "best value",
                    format!("#{} (EV {})", best.index, num(best.expected_value)),
                ),
                None => output::print_warn("no parlay has positive EV"),
            }
            if let Some(top) = &comparison.highest_payout {
                output::print_kv(
                    "highest payout",
                    format!("#{} ({})", top.index, num(top.projected_payout)),
                );
            }
            Ok(())
        }
    }
}
