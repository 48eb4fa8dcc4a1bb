use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Result, SharplineError};
use crate::pricing::odds as normalizer;

/// Odds quoting convention. Callers must always tag their odds; there is no
/// range-based guessing between American and decimal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum OddsFormat {
    American,
    Decimal,
}

impl OddsFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OddsFormat::American => "american",
            OddsFormat::Decimal => "decimal",
        }
    }
}

impl std::fmt::Display for OddsFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OddsFormat {
    type Err = SharplineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "american" | "us" => Ok(OddsFormat::American),
            "decimal" | "eu" => Ok(OddsFormat::Decimal),
            "auto" => Err(SharplineError::InvalidOdds(
                "odds format 'auto' is not supported; tag odds as 'american' or 'decimal'".into(),
            )),
            other => Err(SharplineError::InvalidOdds(format!(
                "unknown odds format '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for OddsFormat {
    type Error = SharplineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// A price quote tagged with its format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", content = "value", rename_all = "lowercase")]
pub enum Odds {
    American(i32),
    Decimal(Decimal),
}

impl Odds {
    /// American odds; `|value| < 100` has no standard meaning and is rejected
    pub fn american(value: i32) -> Result<Self> {
        normalizer::validate_american(value)?;
        Ok(Odds::American(value))
    }

    /// Decimal odds, strictly greater than 1.0
    pub fn decimal(value: Decimal) -> Result<Self> {
        normalizer::validate_decimal(value)?;
        Ok(Odds::Decimal(value))
    }

    /// Stake-returning quote of exactly 1.0
    pub fn push() -> Self {
        Odds::Decimal(Decimal::ONE)
    }

    /// Build odds from an already-parsed value in the given format
    pub fn from_value(value: Decimal, format: OddsFormat) -> Result<Self> {
        match format {
            OddsFormat::American => {
                if !value.fract().is_zero() {
                    return Err(SharplineError::InvalidOdds(format!(
                        "American odds must be whole numbers, got {}",
                        value
                    )));
                }
                let american = value.to_i32().ok_or_else(|| {
                    SharplineError::InvalidOdds(format!("American odds out of range: {}", value))
                })?;
                Odds::american(american)
            }
            OddsFormat::Decimal => Odds::decimal(value),
        }
    }

    pub fn format(&self) -> OddsFormat {
        match self {
            Odds::American(_) => OddsFormat::American,
            Odds::Decimal(_) => OddsFormat::Decimal,
        }
    }

    pub fn is_push(&self) -> bool {
        matches!(self, Odds::Decimal(d) if *d == Decimal::ONE)
    }

    pub fn to_decimal(&self) -> Result<Decimal> {
        match self {
            Odds::American(a) => normalizer::american_to_decimal(*a),
            Odds::Decimal(d) if *d == Decimal::ONE => Ok(Decimal::ONE),
            Odds::Decimal(d) => {
                normalizer::validate_decimal(*d)?;
                Ok(*d)
            }
        }
    }

    /// American equivalent; exact for American quotes, derived otherwise
    pub fn to_american(&self) -> Result<Decimal> {
        match self {
            Odds::American(a) => Ok(Decimal::from(*a)),
            Odds::Decimal(d) => normalizer::decimal_to_american(*d),
        }
    }

    pub fn implied_probability(&self) -> Result<Decimal> {
        normalizer::implied_probability(self.to_decimal()?)
    }
}

impl std::fmt::Display for Odds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Odds::American(a) if *a > 0 => write!(f, "+{}", a),
            Odds::American(a) => write!(f, "{}", a),
            Odds::Decimal(d) => write!(f, "{}", d),
        }
    }
}

/// Raw odds value as received at the boundary: a JSON number or a numeric string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OddsValue {
    Number(f64),
    Text(String),
}

impl OddsValue {
    pub fn to_decimal(&self) -> Result<Decimal> {
        match self {
            OddsValue::Number(n) => {
                if !n.is_finite() {
                    return Err(SharplineError::InvalidOdds(format!(
                        "odds must be finite, got {}",
                        n
                    )));
                }
                Decimal::from_f64(*n).ok_or_else(|| {
                    SharplineError::InvalidOdds(format!("odds not representable: {}", n))
                })
            }
            OddsValue::Text(s) => {
                let trimmed = s.trim();
                let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
                Decimal::from_str(unsigned).map_err(|_| {
                    SharplineError::InvalidOdds(format!("unparseable odds '{}'", s))
                })
            }
        }
    }

    /// Parse into tagged odds. Push legs may quote exactly 1.0 in decimal format.
    pub fn to_odds(&self, format: OddsFormat, allow_push: bool) -> Result<Odds> {
        let value = self.to_decimal()?;
        if allow_push && format == OddsFormat::Decimal && value == Decimal::ONE {
            return Ok(Odds::push());
        }
        Odds::from_value(value, format)
    }
}

impl From<Decimal> for OddsValue {
    fn from(value: Decimal) -> Self {
        OddsValue::Text(value.to_string())
    }
}

impl From<i32> for OddsValue {
    fn from(value: i32) -> Self {
        OddsValue::Number(value as f64)
    }
}
