/// Boundary validation for submitted markets, parlays and finder options
///
/// Every check runs before any computation. Violations are collected per field
/// so the caller sees all problems in one response instead of the first one.
use rust_decimal::Decimal;

use crate::domain::MarketSubmission;
use crate::error::{Result, SharplineError, ValidationErrors};
use crate::pricing::vig::BaselineBook;

/// Validate a probability (must be between 0 and 1)
///
/// # Arguments
/// * `probability` - Probability to validate
/// * `field_name` - Name of the field for error messages
pub fn validate_probability(probability: Decimal, field_name: &str) -> Result<()> {
    if probability < Decimal::ZERO || probability > Decimal::ONE {
        let mut errors = ValidationErrors::new();
        errors.push(
            field_name,
            format!("probability must be between 0 and 1, got {}", probability),
        );
        return Err(SharplineError::Validation(errors));
    }
    Ok(())
}

/// Validate a stake (must be positive)
pub fn validate_stake(stake: Decimal) -> Result<()> {
    if stake <= Decimal::ZERO {
        let mut errors = ValidationErrors::new();
        errors.push("stake", format!("stake must be positive, got {}", stake));
        return Err(SharplineError::Validation(errors));
    }
    Ok(())
}

/// Validate a single market submission
///
/// Requires at least one book, a non-empty and equal outcome count across
/// books, parseable American prices and at least one baseline-eligible book.
pub fn validate_market_submission(
    submission: &MarketSubmission,
    baseline: &dyn BaselineBook,
) -> Result<()> {
    let mut errors = ValidationErrors::new();

    if submission.market.trim().is_empty() {
        errors.push("market", "market key cannot be empty");
    }

    if submission.books.is_empty() {
        errors.push("books", "at least one book is required");
        return errors.into_result();
    }

    let expected = submission.books[0].outcomes.len();
    for (i, book) in submission.books.iter().enumerate() {
        if book.name.trim().is_empty() {
            errors.push(format!("books[{}].name", i), "book name cannot be empty");
        }
        if book.outcomes.is_empty() {
            errors.push(
                format!("books[{}].outcomes", i),
                "at least one outcome is required",
            );
        } else if book.outcomes.len() != expected {
            errors.push(
                format!("books[{}].outcomes", i),
                format!(
                    "expected {} outcomes (as quoted by {}), got {}",
                    expected,
                    submission.books[0].name,
                    book.outcomes.len()
                ),
            );
        }
        for (j, outcome) in book.outcomes.iter().enumerate() {
            if outcome.name.trim().is_empty() {
                errors.push(
                    format!("books[{}].outcomes[{}].name", i, j),
                    "outcome name cannot be empty",
                );
            }
            if let Err(e) = outcome.odds() {
                errors.push(format!("books[{}].outcomes[{}].price", i, j), e.to_string());
            }
        }
    }

    if !submission
        .books
        .iter()
        .any(|b| baseline.is_baseline_name(&b.name))
    {
        errors.push("books", "no baseline-eligible book in submission");
    }

    errors.into_result()
}

/// Validate parlay inputs that do not depend on odds parsing
pub fn validate_parlay_request(
    leg_count: usize,
    stake: Decimal,
    probabilities: &[Option<Decimal>],
) -> Result<()> {
    let mut errors = ValidationErrors::new();

    if leg_count == 0 {
        errors.push("legs", "a parlay needs at least one leg");
    }
    if stake <= Decimal::ZERO {
        errors.push("stake", format!("stake must be positive, got {}", stake));
    }
    for (i, p) in probabilities.iter().enumerate() {
        if let Some(p) = p {
            if *p < Decimal::ZERO || *p > Decimal::ONE {
                errors.push(
                    format!("legs[{}].trueProbability", i),
                    format!("probability must be between 0 and 1, got {}", p),
                );
            }
        }
    }

    errors.into_result()
}

/// Validate finder and parlay-assembly options
pub fn validate_finder_options(
    max_bets: usize,
    legs: usize,
    player_props_ratio: Decimal,
) -> Result<()> {
    let mut errors = ValidationErrors::new();

    if max_bets == 0 {
        errors.push("maxBets", "must be at least 1");
    }
    if legs == 0 {
        errors.push("legs", "must be at least 1");
    }
    if player_props_ratio < Decimal::ZERO || player_props_ratio > Decimal::ONE {
        errors.push(
            "playerPropsRatio",
            format!("must be between 0 and 1, got {}", player_props_ratio),
        );
    }

    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookQuotes, OutcomeQuote};
    use crate::pricing::vig::KeywordBaseline;
    use rust_decimal_macros::dec;

    fn book(name: &str, prices: &[i32]) -> BookQuotes {
        BookQuotes {
            name: name.into(),
            outcomes: prices
                .iter()
                .enumerate()
                .map(|(i, p)| OutcomeQuote::new(format!("Team {}", i), *p))
                .collect(),
        }
    }

    fn fields(result: Result<()>) -> Vec<String> {
        match result {
            Err(SharplineError::Validation(v)) => v.errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_probability() {
        assert!(validate_probability(dec!(0.0), "p").is_ok());
        assert!(validate_probability(dec!(0.5), "p").is_ok());
        assert!(validate_probability(dec!(1.0), "p").is_ok());
        assert!(validate_probability(dec!(-0.1), "p").is_err());
        assert!(validate_probability(dec!(1.1), "p").is_err());
    }

    #[test]
    fn test_validate_stake() {
        assert!(validate_stake(dec!(10)).is_ok());
        assert!(validate_stake(dec!(0)).is_err());
        assert!(validate_stake(dec!(-5)).is_err());
    }

    #[test]
    fn test_valid_market_submission() {
        let submission = MarketSubmission {
            market: "h2h".into(),
            game: None,
            books: vec![book("pinnacle", &[-105, -105]), book("fanduel", &[-110, -110])],
        };
        assert!(validate_market_submission(&submission, &KeywordBaseline::default()).is_ok());
    }

    #[test]
    fn test_market_submission_without_books() {
        let submission = MarketSubmission {
            market: "h2h".into(),
            game: None,
            books: vec![],
        };
        let f = fields(validate_market_submission(
            &submission,
            &KeywordBaseline::default(),
        ));
        assert_eq!(f, vec!["books"]);
    }

    #[test]
    fn test_market_submission_reports_every_field() {
        let submission = MarketSubmission {
            market: "h2h".into(),
            game: None,
            books: vec![
                book("draftkings", &[-110, -110]),
                book("fanduel", &[-110, -110, 300]),
                book("caesars", &[-110, 0]),
            ],
        };
        let f = fields(validate_market_submission(
            &submission,
            &KeywordBaseline::default(),
        ));
        assert!(f.contains(&"books[1].outcomes".to_string()));
        assert!(f.contains(&"books[2].outcomes[1].price".to_string()));
        assert!(f.contains(&"books".to_string()));
    }

    #[test]
    fn test_validate_parlay_request() {
        assert!(validate_parlay_request(2, dec!(10), &[Some(dec!(0.5)), None]).is_ok());

        let f = fields(validate_parlay_request(0, dec!(0), &[]));
        assert_eq!(f, vec!["legs", "stake"]);

        let f = fields(validate_parlay_request(1, dec!(1), &[Some(dec!(1.5))]));
        assert_eq!(f, vec!["legs[0].trueProbability"]);
    }

    #[test]
    fn test_validate_finder_options() {
        assert!(validate_finder_options(20, 4, dec!(0.5)).is_ok());
        let f = fields(validate_finder_options(0, 0, dec!(1.5)));
        assert_eq!(f, vec!["maxBets", "legs", "playerPropsRatio"]);
    }
}
