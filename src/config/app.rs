//! Application configuration loading from config.toml
//!
//! The TOML file carries the loan policy applied by the borrow orchestrator and an
//! optional list of inventory items used to seed an empty database. Every policy field
//! has a default, so a missing `[loan_policy]` table yields the stock policy.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Rules applied when creating and transitioning borrows
    #[serde(default)]
    pub loan_policy: LoanPolicy,
    /// Inventory items to seed when their code is missing
    #[serde(default)]
    pub inventory: Vec<InventorySeed>,
}

/// Rules for creating and resolving loans
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoanPolicy {
    /// Longest allowed span between borrow date and due date, `None` disables the check
    pub max_loan_days: Option<i64>,
    /// Loan period assumed when a borrow has no due date
    pub default_loan_days: i64,
    /// Put reserved units back on the shelf when a request is rejected
    pub restock_on_reject: bool,
    /// Allow marking a pending line as returned without approving it first
    pub allow_pending_return: bool,
    /// Upper bound on a single notification delivery
    pub notification_timeout_secs: u64,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            max_loan_days: Some(14),
            default_loan_days: 7,
            restock_on_reject: true,
            allow_pending_return: true,
            notification_timeout_secs: 10,
        }
    }
}

/// Configuration for a single seeded inventory item
#[derive(Debug, Deserialize, Clone)]
pub struct InventorySeed {
    pub name: String,
    /// Unique inventory code
    pub code: String,
    pub quantity: i32,
}

/// Loads application configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses application configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from the path in `APP_CONFIG_PATH`, or `./config.toml`.
///
/// A missing file is not an error: the defaults are used instead.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("APP_CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        load_config(path)
    } else {
        debug!("No configuration file at {}, using defaults", path);
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [loan_policy]
            max_loan_days = 21
            default_loan_days = 5
            restock_on_reject = false
            allow_pending_return = false
            notification_timeout_secs = 3

            [[inventory]]
            name = "Projector"
            code = "PRJ-001"
            quantity = 2

            [[inventory]]
            name = "HDMI Cable"
            code = "CBL-010"
            quantity = 12
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.loan_policy.max_loan_days, Some(21));
        assert_eq!(config.loan_policy.default_loan_days, 5);
        assert!(!config.loan_policy.restock_on_reject);
        assert!(!config.loan_policy.allow_pending_return);
        assert_eq!(config.loan_policy.notification_timeout_secs, 3);
        assert_eq!(config.inventory.len(), 2);
        assert_eq!(config.inventory[1].code, "CBL-010");
        assert_eq!(config.inventory[1].quantity, 12);
    }

    #[test]
    fn test_missing_policy_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.loan_policy, LoanPolicy::default());
        assert_eq!(config.loan_policy.max_loan_days, Some(14));
        assert!(config.inventory.is_empty());
    }

    #[test]
    fn test_partial_policy_keeps_other_defaults() {
        let config = parse_config("[loan_policy]\nrestock_on_reject = false\n").unwrap();
        assert!(!config.loan_policy.restock_on_reject);
        assert_eq!(config.loan_policy.default_loan_days, 7);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = parse_config("[loan_policy\n");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
