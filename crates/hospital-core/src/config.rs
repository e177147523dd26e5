//! Runtime configuration
//!
//! Embedders load it from JSON. The coordinator zome reads the same fields
//! from DNA properties.

use serde::{Deserialize, Serialize};

/// What the synchronizer does with mirror fields when a reference is null.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClearedReferencePolicy {
    /// Null the mirrors of an absent reference.
    #[default]
    Clear,
    /// Keep whatever the mirrors held before the reference was cleared.
    Retain,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HospitalConfig {
    pub cleared_reference: ClearedReferencePolicy,
    /// Symbol used when rendering billing verification results
    pub currency_symbol: String,
}

impl Default for HospitalConfig {
    fn default() -> Self {
        Self {
            cleared_reference: ClearedReferencePolicy::Clear,
            currency_symbol: "$".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse hospital config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid hospital config: {0}")]
    Invalid(String),
}

impl HospitalConfig {
    pub const MAX_SYMBOL_LEN: usize = 4;

    /// Parse and validate a JSON document. Missing keys take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: HospitalConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency_symbol.is_empty() {
            return Err(ConfigError::Invalid("currency_symbol cannot be empty".to_string()));
        }
        if self.currency_symbol.chars().count() > Self::MAX_SYMBOL_LEN {
            return Err(ConfigError::Invalid(format!(
                "currency_symbol cannot exceed {} characters",
                Self::MAX_SYMBOL_LEN
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HospitalConfig::from_json("{}").unwrap();
        assert_eq!(config, HospitalConfig::default());
        assert_eq!(config.cleared_reference, ClearedReferencePolicy::Clear);
        assert_eq!(config.currency_symbol, "$");
    }

    #[test]
    fn test_retain_policy() {
        let config = HospitalConfig::from_json(r#"{"cleared_reference": "retain"}"#).unwrap();
        assert_eq!(config.cleared_reference, ClearedReferencePolicy::Retain);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            HospitalConfig::from_json(r#"{"cleared_reference": "forget"}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            HospitalConfig::from_json(r#"{"currency_symbol": ""}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            HospitalConfig::from_json(r#"{"currency_symbol": "EURO$"}"#),
            Err(ConfigError::Invalid(_))
        ));
    }
}
