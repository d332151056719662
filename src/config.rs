//! Engine configuration
//!
//! Reward and fee rates, the seller sales-limit multiplier, per-category
//! initial block allocations, and the webhook shared secret. A config can be
//! loaded from a TOML file; decimal values are written as strings
//! (`admin_fee_rate = "0.20"`) to keep fixed-point precision exact.

use crate::types::{MarketError, UserCategory};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

/// Tunable parameters of the marketplace engine
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum order price as a multiple of the seller's block balance
    pub sales_limit_multiplier: Decimal,

    /// Fraction of order value transferred from seller to buyer on delivery
    pub delivery_reward_rate: Decimal,

    /// Fraction of order value newly minted for the buyer on delivery
    pub mint_rate: Decimal,

    /// Fraction of an exchange trade's fiat value retained by the platform
    pub admin_fee_rate: Decimal,

    /// Fraction of a first completed transaction rewarded to the referrer
    pub referral_rate: Decimal,

    /// Blocks minted for a newly registered individual
    pub individual_allocation: Decimal,

    /// Blocks minted for a newly registered venture
    pub venture_allocation: Decimal,

    /// Blocks minted for a newly registered company
    pub company_allocation: Decimal,

    /// Shared secret authenticating payment-processor webhooks
    pub webhook_secret: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sales_limit_multiplier: Decimal::new(10, 0),
            delivery_reward_rate: Decimal::new(10, 2),
            mint_rate: Decimal::new(10, 2),
            admin_fee_rate: Decimal::new(20, 2),
            referral_rate: Decimal::new(5, 2),
            individual_allocation: Decimal::new(100_000, 0),
            venture_allocation: Decimal::new(500_000, 0),
            company_allocation: Decimal::new(1_000_000, 0),
            webhook_secret: String::new(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a TOML file
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Config` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, MarketError> {
        let raw = std::fs::read_to_string(path).map_err(|e| MarketError::Config {
            message: format!("failed to read '{}': {}", path.display(), e),
        })?;
        toml::from_str(&raw).map_err(|e| MarketError::Config {
            message: format!("failed to parse '{}': {}", path.display(), e),
        })
    }

    /// Initial block allocation for a registration category
    pub fn initial_allocation(&self, category: UserCategory) -> Decimal {
        match category {
            UserCategory::Individual => self.individual_allocation,
            UserCategory::Venture => self.venture_allocation,
            UserCategory::Company => self.company_allocation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_rates() {
        let config = EngineConfig::default();
        assert_eq!(config.sales_limit_multiplier, Decimal::new(10, 0));
        assert_eq!(config.delivery_reward_rate, Decimal::new(10, 2));
        assert_eq!(config.mint_rate, Decimal::new(10, 2));
        assert_eq!(config.admin_fee_rate, Decimal::new(20, 2));
        assert_eq!(config.referral_rate, Decimal::new(5, 2));
    }

    #[test]
    fn test_initial_allocation_by_category() {
        let config = EngineConfig::default();
        assert_eq!(
            config.initial_allocation(UserCategory::Individual),
            Decimal::new(100_000, 0)
        );
        assert_eq!(
            config.initial_allocation(UserCategory::Venture),
            Decimal::new(500_000, 0)
        );
        assert_eq!(
            config.initial_allocation(UserCategory::Company),
            Decimal::new(1_000_000, 0)
        );
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "admin_fee_rate = \"0.25\"").unwrap();
        writeln!(file, "webhook_secret = \"sk_test\"").unwrap();
        file.flush().unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.admin_fee_rate, Decimal::new(25, 2));
        assert_eq!(config.webhook_secret, "sk_test");
        // untouched keys keep their defaults
        assert_eq!(config.sales_limit_multiplier, Decimal::new(10, 0));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let result = EngineConfig::load(Path::new("no_such_config.toml"));
        assert!(matches!(result, Err(MarketError::Config { .. })));
    }
}
