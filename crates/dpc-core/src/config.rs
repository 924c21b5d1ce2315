//! Agent configuration parsing.
//!
//! Configuration is a small TOML document. Every field has a default so an
//! empty document is valid apart from the package identity, which must be
//! set before the lock-task allowlist can be built.

use serde::{Deserialize, Serialize};

/// Default broadcast action accepted as a boot-resume trigger.
pub const DEFAULT_RESUME_ACTION: &str = "boot_completed";

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration is structurally valid but unusable.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Package identity of the managed application; used as the lock-task
    /// allowlist entry.
    #[serde(default)]
    pub package: String,

    /// System broadcast actions accepted as boot-resume triggers.
    ///
    /// Device vendors deliver boot-adjacent signals under their own action
    /// names; entries beyond the default are deployment-specific.
    #[serde(default = "default_resume_actions")]
    pub resume_actions: Vec<String>,

    /// Explanation text shown alongside the privilege-consent flow.
    #[serde(default = "default_consent_explanation")]
    pub consent_explanation: String,
}

fn default_resume_actions() -> Vec<String> {
    vec![DEFAULT_RESUME_ACTION.to_string()]
}

fn default_consent_explanation() -> String {
    "Administrator privileges are required for this app.".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            package: String::new(),
            resume_actions: default_resume_actions(),
            consent_explanation: default_consent_explanation(),
        }
    }
}

impl AgentConfig {
    /// Creates a configuration for the given package with defaults for
    /// everything else.
    #[must_use]
    pub fn for_package(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when the package identity is
    /// empty or the resume-action allowlist is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.package.is_empty() {
            return Err(ConfigError::Validation(
                "'package' must name the managed application".to_string(),
            ));
        }
        if self.resume_actions.is_empty() {
            return Err(ConfigError::Validation(
                "'resume_actions' must contain at least one action".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.resume_actions, vec![DEFAULT_RESUME_ACTION]);
        assert!(!config.consent_explanation.is_empty());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = AgentConfig::from_toml("package = \"com.example.kiosk\"").unwrap();
        assert_eq!(config.package, "com.example.kiosk");
        assert_eq!(config.resume_actions, vec![DEFAULT_RESUME_ACTION]);
    }

    #[test]
    fn test_parse_vendor_actions() {
        let config = AgentConfig::from_toml(
            r#"
            package = "com.example.kiosk"
            resume_actions = ["boot_completed", "vendor.scanner.WARM_BOOT"]
            "#,
        )
        .unwrap();
        assert_eq!(config.resume_actions.len(), 2);
    }

    #[test]
    fn test_empty_package_rejected() {
        let err = AgentConfig::from_toml("").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_empty_resume_actions_rejected() {
        let err = AgentConfig::from_toml(
            r#"
            package = "com.example.kiosk"
            resume_actions = []
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
