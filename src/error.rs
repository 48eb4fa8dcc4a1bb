use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for odds, EV and parlay computation
#[derive(Error, Debug)]
pub enum SharplineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Odds / market data errors
    #[error("Invalid odds: {0}")]
    InvalidOdds(String),

    #[error("Invalid market: {0}")]
    InvalidMarket(String),

    #[error("Outcome mismatch for {book} at index {index}: expected {expected}, found {found}")]
    OutcomeMismatch {
        book: String,
        index: usize,
        expected: String,
        found: String,
    },

    #[error("Baseline unavailable: {0}")]
    BaselineUnavailable(String),

    // Parlay errors
    #[error("Parlay error: {0}")]
    Parlay(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for SharplineError
pub type Result<T> = std::result::Result<T, SharplineError>;

impl SharplineError {
    /// Stable machine-readable code, used as the `error` field of an [`ErrorReport`]
    pub fn code(&self) -> &'static str {
        match self {
            SharplineError::Config(_) => "config_error",
            SharplineError::Json(_) => "json_error",
            SharplineError::InvalidOdds(_) => "invalid_odds",
            SharplineError::InvalidMarket(_) => "invalid_market",
            SharplineError::OutcomeMismatch { .. } => "outcome_mismatch",
            SharplineError::BaselineUnavailable(_) => "baseline_unavailable",
            SharplineError::Parlay(_) => "parlay_error",
            SharplineError::Validation(_) => "validation_error",
            SharplineError::Io(_) => "io_error",
            SharplineError::Other(_) => "internal_error",
        }
    }

    /// Whether this error was raised before any computation ran
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SharplineError::Validation(_) | SharplineError::InvalidOdds(_)
        )
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from(self)
    }
}

impl From<ValidationErrors> for SharplineError {
    fn from(errors: ValidationErrors) -> Self {
        SharplineError::Validation(errors)
    }
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All validation failures found for one submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Ok when nothing was recorded, otherwise the collected errors
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(SharplineError::Validation(self))
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Structured `{error, message}` value returned next to partial results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl ErrorReport {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            fields: Vec::new(),
        }
    }
}

impl From<&SharplineError> for ErrorReport {
    fn from(err: &SharplineError) -> Self {
        let fields = match err {
            SharplineError::Validation(v) => v.errors.clone(),
            _ => Vec::new(),
        };
        Self {
            error: err.code().to_string(),
            message: err.to_string(),
            fields,
        }
    }
}

impl From<SharplineError> for ErrorReport {
    fn from(err: SharplineError) -> Self {
        ErrorReport::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_collect_fields() {
        let mut errors = ValidationErrors::new();
        errors.push("books", "at least one book is required");
        errors.push("books[1].outcomes", "expected 2 outcomes, got 3");

        assert_eq!(errors.len(), 2);
        assert!(errors.has_field("books[1].outcomes"));

        let err = errors.into_result().unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert!(err.to_string().contains("books: at least one book is required"));
    }

    #[test]
    fn test_empty_validation_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_error_report_carries_fields() {
        let mut errors = ValidationErrors::new();
        errors.push("stake", "must be positive");
        let report = SharplineError::from(errors).report();

        assert_eq!(report.error, "validation_error");
        assert_eq!(report.fields.len(), 1);
        assert_eq!(report.fields[0].field, "stake");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SharplineError::InvalidOdds("0".into()).code(),
            "invalid_odds"
        );
        assert_eq!(
            SharplineError::InvalidMarket("overround".into()).code(),
            "invalid_market"
        );
        let mismatch = SharplineError::OutcomeMismatch {
            book: "draftkings".into(),
            index: 0,
            expected: "Lakers".into(),
            found: "Celtics".into(),
        };
        assert_eq!(mismatch.code(), "outcome_mismatch");
        assert!(mismatch.to_string().contains("draftkings"));
    }

    #[test]
    fn test_report_serializes_without_empty_fields() {
        let report = ErrorReport::new("invalid_market", "overround must be positive");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["error"], "invalid_market");
        assert!(json.get("fields").is_none());
    }
}
