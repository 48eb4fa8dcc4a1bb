//! Outcome matching between a book's quote and the baseline outcomes
//!
//! Names are compared by a chain of matchers (exact first, then normalized).
//! Player descriptions go through the same matcher, and lines must agree
//! within [`POINT_TOLERANCE`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::OutcomeQuote;
use crate::pricing::vig::BaselineOutcome;

/// Maximum difference between two spread/total lines considered equal
pub const POINT_TOLERANCE: Decimal = dec!(0.01);

/// Compares two outcome names
pub trait OutcomeMatcher: Send + Sync {
    fn name(&self) -> &'static str;
    fn matches(&self, candidate: &str, reference: &str) -> bool;
}

/// Byte-for-byte equality
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl OutcomeMatcher for ExactMatch {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn matches(&self, candidate: &str, reference: &str) -> bool {
        candidate == reference
    }
}

/// Lowercased, alphanumerics only: `"St. Louis Blues"` == `"st louis blues"`
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedMatch;

impl OutcomeMatcher for NormalizedMatch {
    fn name(&self) -> &'static str {
        "normalized"
    }

    fn matches(&self, candidate: &str, reference: &str) -> bool {
        let candidate = normalize_name(candidate);
        !candidate.is_empty() && candidate == normalize_name(reference)
    }
}

pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn points_match(a: Option<Decimal>, b: Option<Decimal>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => (a - b).abs() < POINT_TOLERANCE,
        _ => false,
    }
}

/// The parts of an outcome that identify a selection
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub point: Option<Decimal>,
}

impl<'a> From<&'a OutcomeQuote> for Selection<'a> {
    fn from(quote: &'a OutcomeQuote) -> Self {
        Self {
            name: &quote.name,
            description: quote.description.as_deref(),
            point: quote.point,
        }
    }
}

impl<'a> From<&'a BaselineOutcome> for Selection<'a> {
    fn from(outcome: &'a BaselineOutcome) -> Self {
        Self {
            name: &outcome.name,
            description: outcome.description.as_deref(),
            point: outcome.point,
        }
    }
}

/// Ordered list of matchers; the first one that pairs a selection wins
pub struct MatcherChain {
    matchers: Vec<Box<dyn OutcomeMatcher>>,
}

impl MatcherChain {
    pub fn new(matchers: Vec<Box<dyn OutcomeMatcher>>) -> Self {
        Self { matchers }
    }

    pub fn exact_only() -> Self {
        Self::new(vec![Box::new(ExactMatch)])
    }

    pub fn matcher_names(&self) -> Vec<&'static str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    fn same_selection(matcher: &dyn OutcomeMatcher, a: Selection<'_>, b: Selection<'_>) -> bool {
        let descriptions_match = match (a.description, b.description) {
            (None, None) => true,
            (Some(x), Some(y)) => matcher.matches(x, y),
            _ => false,
        };
        descriptions_match && matcher.matches(a.name, b.name) && points_match(a.point, b.point)
    }

    /// Whether two selections refer to the same outcome under any matcher
    pub fn is_match(&self, a: Selection<'_>, b: Selection<'_>) -> bool {
        self.matchers
            .iter()
            .any(|m| Self::same_selection(m.as_ref(), a, b))
    }

    /// Find the baseline outcome for a selection. Returns it with the name of the
    /// matcher that paired them.
    pub fn find<'b>(
        &self,
        selection: Selection<'_>,
        baseline: &'b [BaselineOutcome],
    ) -> Option<(&'b BaselineOutcome, &'static str)> {
        for matcher in &self.matchers {
            if let Some(found) = baseline
                .iter()
                .find(|o| Self::same_selection(matcher.as_ref(), selection, Selection::from(*o)))
            {
                return Some((found, matcher.name()));
            }
        }
        None
    }
}

impl Default for MatcherChain {
    fn default() -> Self {
        Self::new(vec![Box::new(ExactMatch), Box::new(NormalizedMatch)])
    }
}

impl std::fmt::Debug for MatcherChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatcherChain")
            .field("matchers", &self.matcher_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(name: &str, point: Option<Decimal>, description: Option<&str>) -> BaselineOutcome {
        BaselineOutcome {
            name: name.into(),
            description: description.map(String::from),
            point,
            decimal_odds: dec!(1.95),
            implied_probability: dec!(0.5128),
            fair_probability: dec!(0.5),
        }
    }

    #[test]
    fn test_exact_match() {
        assert!(ExactMatch.matches("Boston Celtics", "Boston Celtics"));
        assert!(!ExactMatch.matches("boston celtics", "Boston Celtics"));
    }

    #[test]
    fn test_normalized_match() {
        assert!(NormalizedMatch.matches("St. Louis Blues", "st louis blues"));
        assert!(NormalizedMatch.matches("Over", "OVER"));
        assert!(!NormalizedMatch.matches("Over", "Under"));
        assert!(!NormalizedMatch.matches("...", "!!!"));
        assert_eq!(normalize_name("L.A. Clippers"), "laclippers");
    }

    #[test]
    fn test_points_match() {
        assert!(points_match(None, None));
        assert!(points_match(Some(dec!(3.5)), Some(dec!(3.5))));
        assert!(points_match(Some(dec!(3.5)), Some(dec!(3.505))));
        assert!(!points_match(Some(dec!(3.5)), Some(dec!(4.0))));
        assert!(!points_match(Some(dec!(3.5)), None));
    }

    #[test]
    fn test_chain_prefers_exact() {
        let chain = MatcherChain::default();
        let outcomes = vec![baseline("la lakers", None, None), baseline("LA Lakers", None, None)];
        let quote = OutcomeQuote::new("LA Lakers", 120);

        let (found, matcher) = chain.find(Selection::from(&quote), &outcomes).unwrap();
        assert_eq!(found.name, "LA Lakers");
        assert_eq!(matcher, "exact");
    }

    #[test]
    fn test_chain_falls_back_to_normalized() {
        let chain = MatcherChain::default();
        let outcomes = vec![baseline("Los Angeles Lakers", None, None)];
        let quote = OutcomeQuote::new("Los-Angeles Lakers", 120);

        let (_, matcher) = chain.find(Selection::from(&quote), &outcomes).unwrap();
        assert_eq!(matcher, "normalized");
        assert!(MatcherChain::exact_only()
            .find(Selection::from(&quote), &outcomes)
            .is_none());
    }

    #[test]
    fn test_chain_requires_point_and_player() {
        let chain = MatcherChain::default();
        let outcomes = vec![
            baseline("Over", Some(dec!(25.5)), Some("LeBron James")),
            baseline("Over", Some(dec!(8.5)), Some("Anthony Davis")),
        ];

        let quote = OutcomeQuote::new("Over", -110)
            .with_point(dec!(8.5))
            .with_description("anthony davis");
        let (found, _) = chain.find(Selection::from(&quote), &outcomes).unwrap();
        assert_eq!(found.description.as_deref(), Some("Anthony Davis"));

        let wrong_line = OutcomeQuote::new("Over", -110)
            .with_point(dec!(26.5))
            .with_description("LeBron James");
        assert!(chain.find(Selection::from(&wrong_line), &outcomes).is_none());

        let no_player = OutcomeQuote::new("Over", -110).with_point(dec!(25.5));
        assert!(chain.find(Selection::from(&no_player), &outcomes).is_none());
    }
}
