//! Odds normalization
//!
//! Pure conversions between American odds, decimal odds and implied probability.
//! All arithmetic is done in `Decimal`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{Odds, OddsFormat};
use crate::error::{Result, SharplineError};

const HUNDRED: Decimal = dec!(100);
const EVEN_MONEY: Decimal = dec!(2);

/// American odds must be at least +/-100
pub fn validate_american(american: i32) -> Result<()> {
    if american.unsigned_abs() < 100 {
        return Err(SharplineError::InvalidOdds(format!(
            "American odds must satisfy |odds| >= 100, got {}",
            american
        )));
    }
    Ok(())
}

/// Decimal odds must be strictly greater than 1.0
pub fn validate_decimal(decimal: Decimal) -> Result<()> {
    if decimal <= Decimal::ONE {
        return Err(SharplineError::InvalidOdds(format!(
            "decimal odds must be greater than 1.0, got {}",
            decimal
        )));
    }
    Ok(())
}

/// +150 -> 2.5, -110 -> 1.9090...
pub fn american_to_decimal(american: i32) -> Result<Decimal> {
    validate_american(american)?;
    let a = Decimal::from(american);
    if american >= 0 {
        Ok(Decimal::ONE + a / HUNDRED)
    } else {
        Ok(Decimal::ONE + HUNDRED / a.abs())
    }
}

/// 2.5 -> +150, 1.8 -> -125
pub fn decimal_to_american(decimal: Decimal) -> Result<Decimal> {
    validate_decimal(decimal)?;
    let profit = decimal - Decimal::ONE;
    if decimal >= EVEN_MONEY {
        Ok(profit * HUNDRED)
    } else {
        Ok(-HUNDRED / profit)
    }
}

/// American odds rounded to the nearest whole number, for display
pub fn decimal_to_american_rounded(decimal: Decimal) -> Result<i32> {
    let american = decimal_to_american(decimal)?;
    american.round().to_i32().ok_or_else(|| {
        SharplineError::InvalidOdds(format!("American odds out of range for {}", decimal))
    })
}

/// Raw (vig-inflated) probability implied by a decimal price. A push price of
/// exactly 1.0 implies certainty.
pub fn implied_probability(decimal: Decimal) -> Result<Decimal> {
    if decimal < Decimal::ONE {
        return Err(SharplineError::InvalidOdds(format!(
            "decimal odds must be at least 1.0, got {}",
            decimal
        )));
    }
    Ok(Decimal::ONE / decimal)
}

/// Normalize a tagged value to decimal odds
pub fn normalize(value: Decimal, format: OddsFormat) -> Result<Decimal> {
    Odds::from_value(value, format)?.to_decimal()
}

/// Fair decimal price for a probability (`1/p`)
pub fn fair_decimal_odds(probability: Decimal) -> Result<Decimal> {
    if probability <= Decimal::ZERO || probability > Decimal::ONE {
        return Err(SharplineError::InvalidOdds(format!(
            "probability must be in (0, 1], got {}",
            probability
        )));
    }
    Ok(Decimal::ONE / probability)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_american_to_decimal_positive() {
        assert_eq!(american_to_decimal(150).unwrap(), dec!(2.5));
        assert_eq!(american_to_decimal(100).unwrap(), dec!(2));
    }

    #[test]
    fn test_american_to_decimal_negative() {
        assert_eq!(american_to_decimal(-200).unwrap(), dec!(1.5));
        assert_eq!(american_to_decimal(-110).unwrap().round_dp(4), dec!(1.9091));
        assert_eq!(american_to_decimal(-100).unwrap(), dec!(2));
    }

    #[test]
    fn test_invalid_american() {
        assert!(american_to_decimal(0).is_err());
        assert!(american_to_decimal(99).is_err());
        assert!(american_to_decimal(-99).is_err());
    }

    #[test]
    fn test_decimal_to_american() {
        assert_eq!(decimal_to_american(dec!(2.5)).unwrap(), dec!(150));
        assert_eq!(decimal_to_american(dec!(1.5)).unwrap(), dec!(-200));
        assert_eq!(decimal_to_american(dec!(1.8)).unwrap(), dec!(-125));
        assert_eq!(decimal_to_american(dec!(2.0)).unwrap(), dec!(100));
        assert!(decimal_to_american(dec!(1.0)).is_err());
        assert!(decimal_to_american(dec!(0.5)).is_err());
    }

    #[test]
    fn test_round_trip_american() {
        for american in [-1000, -350, -200, -150, -115, -110, -105, 100, 105, 120, 250, 900]
        {
            let decimal = american_to_decimal(american).unwrap();
            let back = decimal_to_american(decimal).unwrap();
            assert_eq!(
                back.round_dp(8),
                Decimal::from(american),
                "round trip failed for {}",
                american
            );
            assert_eq!(decimal_to_american_rounded(decimal).unwrap(), american);
        }
    }

    #[test]
    fn test_implied_probability() {
        let decimal = american_to_decimal(-110).unwrap();
        let implied = implied_probability(decimal).unwrap();
        // 110 / 210 = 52.38%
        assert_eq!((implied * dec!(100)).round_dp(2), dec!(52.38));
        assert_eq!(implied_probability(dec!(2)).unwrap(), dec!(0.5));
        assert_eq!(implied_probability(Decimal::ONE).unwrap(), Decimal::ONE);
        assert!(implied_probability(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(dec!(150), OddsFormat::American).unwrap(), dec!(2.5));
        assert_eq!(normalize(dec!(1.91), OddsFormat::Decimal).unwrap(), dec!(1.91));
        assert!(normalize(dec!(0), OddsFormat::American).is_err());
        assert!(normalize(dec!(0), OddsFormat::Decimal).is_err());
        // 5 is a valid decimal price but not a valid American one
        assert!(normalize(dec!(5), OddsFormat::American).is_err());
        assert_eq!(normalize(dec!(5), OddsFormat::Decimal).unwrap(), dec!(5));
    }

    #[test]
    fn test_fair_decimal_odds() {
        assert_eq!(fair_decimal_odds(dec!(0.25)).unwrap(), dec!(4));
        assert!(fair_decimal_odds(Decimal::ZERO).is_err());
    }
}
