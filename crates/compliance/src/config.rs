//! Compliance configuration
//!
//! Jurisdiction lists and the unknown-address policy are configurable via
//! JSON file; missing fields fall back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::error::{ComplianceError, ComplianceResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Jurisdictions that may never transact
    #[serde(default = "default_blocked_jurisdictions")]
    pub blocked_jurisdictions: Vec<String>,

    /// Jurisdictions requiring enhanced KYC for amount-bearing operations
    #[serde(default = "default_high_risk_jurisdictions")]
    pub high_risk_jurisdictions: Vec<String>,

    /// Policy for addresses without a profile
    #[serde(default)]
    pub unknown_address_policy: FailPolicy,
}

/// Policy when an address has no compliance profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailPolicy {
    /// Reject the address (default)
    #[default]
    FailClosed,

    /// Let the address through; for test networks only
    FailOpen,
}

fn default_blocked_jurisdictions() -> Vec<String> {
    ["KP", "IR", "SY", "CU"].iter().map(|s| s.to_string()).collect()
}

fn default_high_risk_jurisdictions() -> Vec<String> {
    ["AF", "BY", "MM", "VE"].iter().map(|s| s.to_string()).collect()
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            blocked_jurisdictions: default_blocked_jurisdictions(),
            high_risk_jurisdictions: default_high_risk_jurisdictions(),
            unknown_address_policy: FailPolicy::default(),
        }
    }
}

impl ComplianceConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> ComplianceResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ComplianceResult<()> {
        let all = self
            .blocked_jurisdictions
            .iter()
            .chain(&self.high_risk_jurisdictions);
        for code in all {
            if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(ComplianceError::ConfigError(format!(
                    "jurisdiction must be an ISO 3166-1 alpha-2 code: {code}"
                )));
            }
        }
        Ok(())
    }

    pub fn is_blocked_jurisdiction(&self, code: &str) -> bool {
        self.blocked_jurisdictions.iter().any(|j| j == code)
    }

    pub fn is_high_risk_jurisdiction(&self, code: &str) -> bool {
        self.high_risk_jurisdictions.iter().any(|j| j == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ComplianceConfig::default();
        assert!(config.is_blocked_jurisdiction("KP"));
        assert!(!config.is_blocked_jurisdiction("US"));
        assert!(config.is_high_risk_jurisdiction("AF"));
        assert_eq!(config.unknown_address_policy, FailPolicy::FailClosed);
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{ "unknown_address_policy": "fail_open" }"#;
        let config: ComplianceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.unknown_address_policy, FailPolicy::FailOpen);
        assert!(config.is_blocked_jurisdiction("IR")); // default
    }

    #[test]
    fn test_from_file_validates() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{ "blocked_jurisdictions": ["north korea"] }}"#)?;

        let result = ComplianceConfig::from_file(file.path());
        assert!(matches!(result, Err(ComplianceError::ConfigError(_))));
        Ok(())
    }
}
