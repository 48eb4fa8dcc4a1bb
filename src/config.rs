use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub baseline: BaselineConfig,
    #[serde(default)]
    pub finder: FinderConfig,
    #[serde(default)]
    pub parlay: ParlayConfig,
    #[serde(default)]
    pub estimation: EstimationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaselineConfig {
    /// Keywords identifying baseline-eligible books, matched case-insensitively
    /// against book key and title
    #[serde(default = "default_baseline_books")]
    pub books: Vec<String>,
}

fn default_baseline_books() -> Vec<String> {
    vec!["pinnacle".to_string()]
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            books: default_baseline_books(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinderConfig {
    /// Minimum EV per unit to keep a bet (e.g., 0.01 = 1%)
    #[serde(default = "default_min_ev")]
    pub min_ev: Decimal,
    /// Maximum bets returned after ranking
    #[serde(default = "default_max_bets")]
    pub max_bets: usize,
    /// Drop bets that could not be matched to a baseline outcome
    #[serde(default)]
    pub require_baseline: bool,
}

fn default_min_ev() -> Decimal {
    dec!(0.01)
}

fn default_max_bets() -> usize {
    20
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            min_ev: default_min_ev(),
            max_bets: default_max_bets(),
            require_baseline: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParlayConfig {
    /// Legs requested when assembling a parlay
    #[serde(default = "default_legs")]
    pub legs: usize,
    /// Fill part of the parlay with player props first
    #[serde(default)]
    pub require_player_props: bool,
    /// Share of legs reserved for player props (e.g., 0.5 = half, rounded up)
    #[serde(default = "default_player_props_ratio")]
    pub player_props_ratio: Decimal,
    /// Stake used for payout projections
    #[serde(default = "default_stake")]
    pub stake: Decimal,
}

fn default_legs() -> usize {
    4
}

fn default_player_props_ratio() -> Decimal {
    dec!(0.5)
}

fn default_stake() -> Decimal {
    dec!(100)
}

impl Default for ParlayConfig {
    fn default() -> Self {
        Self {
            legs: default_legs(),
            require_player_props: false,
            player_props_ratio: default_player_props_ratio(),
            stake: default_stake(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimationConfig {
    /// Assumed vig for standard markets when no baseline exists (e.g., 0.04 = 4%)
    #[serde(default = "default_standard_vig")]
    pub standard_vig: Decimal,
    /// Assumed vig for player-prop markets
    #[serde(default = "default_player_prop_vig")]
    pub player_prop_vig: Decimal,
    /// Share of estimated EV removed for uncertainty (e.g., 0.30 = 30%)
    #[serde(default = "default_uncertainty_discount")]
    pub uncertainty_discount: Decimal,
}

fn default_standard_vig() -> Decimal {
    dec!(0.04)
}

fn default_player_prop_vig() -> Decimal {
    dec!(0.06)
}

fn default_uncertainty_discount() -> Decimal {
    dec!(0.30)
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            standard_vig: default_standard_vig(),
            player_prop_vig: default_player_prop_vig(),
            uncertainty_discount: default_uncertainty_discount(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("SHARPLINE_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (SHARPLINE_FINDER__MIN_EV, etc.)
            .add_source(
                Environment::with_prefix("SHARPLINE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Create a default configuration for CLI usage
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.baseline.books.iter().all(|b| b.trim().is_empty()) {
            errors.push("baseline.books must name at least one book".to_string());
        }

        if self.finder.max_bets == 0 {
            errors.push("finder.max_bets must be at least 1".to_string());
        }

        if self.parlay.legs == 0 {
            errors.push("parlay.legs must be at least 1".to_string());
        }

        if self.parlay.player_props_ratio < Decimal::ZERO
            || self.parlay.player_props_ratio > Decimal::ONE
        {
            errors.push("parlay.player_props_ratio must be between 0 and 1".to_string());
        }

        if self.parlay.stake <= Decimal::ZERO {
            errors.push("parlay.stake must be positive".to_string());
        }

        for (name, vig) in [
            ("estimation.standard_vig", self.estimation.standard_vig),
            ("estimation.player_prop_vig", self.estimation.player_prop_vig),
        ] {
            if vig < Decimal::ZERO || vig >= Decimal::ONE {
                errors.push(format!("{name} must be in [0, 1)"));
            }
        }

        let discount = self.estimation.uncertainty_discount;
        if discount < Decimal::ZERO || discount > Decimal::ONE {
            errors.push("estimation.uncertainty_discount must be between 0 and 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.baseline.books, vec!["pinnacle"]);
        assert_eq!(config.estimation.standard_vig, dec!(0.04));
        assert_eq!(config.estimation.player_prop_vig, dec!(0.06));
        assert_eq!(config.estimation.uncertainty_discount, dec!(0.30));
    }

    #[test]
    fn test_validate_collects_errors() {
        let mut config = AppConfig::default_config();
        config.finder.max_bets = 0;
        config.parlay.player_props_ratio = dec!(1.5);
        config.estimation.standard_vig = dec!(1);

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("sharpline-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            r#"
[baseline]
books = ["pinnacle", "circa"]

[finder]
min_ev = 0.02
max_bets = 5

[parlay]
legs = 3
require_player_props = true
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(config.baseline.books.len(), 2);
        assert_eq!(config.finder.min_ev, dec!(0.02));
        assert_eq!(config.finder.max_bets, 5);
        assert_eq!(config.parlay.legs, 3);
        assert!(config.parlay.require_player_props);
        // untouched sections keep their defaults
        assert_eq!(config.parlay.player_props_ratio, dec!(0.5));
        assert_eq!(config.logging.level, "info");
    }
}
