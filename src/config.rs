//! Tax rules configuration
//!
//! Rates and thresholds default to the current B3 rules and can be
//! overridden from a TOML file:
//!
//! ```toml
//! normal_rate = "0.15"
//! normal_exemption_threshold = "20000.00"
//! minimum_darf = "10.00"
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::TaxError;
use crate::models::Category;

/// Rates and thresholds applied by the regime processors and the DARF aggregator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaxRules {
    pub fixed_income_rate: Decimal,
    pub day_trade_rate: Decimal,
    pub normal_rate: Decimal,
    /// Normal-regime sales at or below this total in a run are tax exempt
    pub normal_exemption_threshold: Decimal,
    /// DARFs below this value are deferred to the next run
    pub minimum_darf: Decimal,
}

impl Default for TaxRules {
    fn default() -> Self {
        Self {
            fixed_income_rate: Decimal::new(20, 2),
            day_trade_rate: Decimal::new(20, 2),
            normal_rate: Decimal::new(15, 2),
            normal_exemption_threshold: Decimal::new(2_000_000, 2),
            minimum_darf: Decimal::new(1000, 2),
        }
    }
}

impl TaxRules {
    pub fn rate(&self, category: Category) -> Decimal {
        match category {
            Category::FixedIncome => self.fixed_income_rate,
            Category::DayTrade => self.day_trade_rate,
            Category::Normal => self.normal_rate,
        }
    }

    /// Sale-total exemption for a regime, if it has one
    pub fn exemption_threshold(&self, category: Category) -> Option<Decimal> {
        match category {
            Category::Normal => Some(self.normal_exemption_threshold),
            Category::FixedIncome | Category::DayTrade => None,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, TaxError> {
        let rules: TaxRules =
            toml::from_str(content).map_err(|e| TaxError::Config(e.to_string()))?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TaxError> {
        let path = path.as_ref();
        debug!("Loading tax rules from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from `path`, or from the default location when it exists, or fall back to defaults
    pub fn resolve(path: Option<&Path>) -> Result<Self, TaxError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_config_path() {
            Some(default) if default.exists() => Self::load(default),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), TaxError> {
        let fields = [
            ("fixed_income_rate", self.fixed_income_rate),
            ("day_trade_rate", self.day_trade_rate),
            ("normal_rate", self.normal_rate),
            ("normal_exemption_threshold", self.normal_exemption_threshold),
            ("minimum_darf", self.minimum_darf),
        ];
        for (name, value) in fields {
            if value < Decimal::ZERO {
                return Err(TaxError::Config(format!("{} must not be negative", name)));
            }
        }
        for (name, value) in &fields[..3] {
            if *value > Decimal::ONE {
                return Err(TaxError::Config(format!("{} must be a fraction, got {}", name, value)));
            }
        }
        Ok(())
    }
}

/// `<config home>/darf/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("darf").join("config.toml"))
}
