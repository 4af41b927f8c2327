//! Policy configuration for the quality controller

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Quality controller policy
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Seconds without a further ceiling change before a growth probe commits
    /// a resolution increase (default: 10)
    #[serde(default = "default_probe_delay")]
    pub probe_delay_secs: u64,

    /// Headroom factor required before growing resolution: the ceiling must
    /// reach `required_bitrate * growth_threshold` (default: 1.3)
    #[serde(default = "default_growth_threshold")]
    pub growth_threshold: f32,
}

fn default_probe_delay() -> u64 {
    10
}

fn default_growth_threshold() -> f32 {
    1.3
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            probe_delay_secs: default_probe_delay(),
            growth_threshold: default_growth_threshold(),
        }
    }
}

impl ControllerConfig {
    pub fn new(probe_delay_secs: u64, growth_threshold: f32) -> Self {
        Self {
            probe_delay_secs,
            growth_threshold,
        }
    }

    /// Probe delay as a [`Duration`]
    pub fn probe_delay(&self) -> Duration {
        Duration::from_secs(self.probe_delay_secs)
    }

    /// Reject thresholds that would let a probe grow past the ceiling
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.growth_threshold.is_finite() || self.growth_threshold < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "growth_threshold must be a finite value >= 1.0, got {}",
                self.growth_threshold
            )));
        }
        Ok(())
    }

    /// Parse and validate a config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save config to specific path
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.probe_delay(), Duration::from_secs(10));
        assert!((config.growth_threshold - 1.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ControllerConfig::from_toml_str("probe_delay_secs = 4\n").unwrap();
        assert_eq!(config.probe_delay_secs, 4);
        assert!((config.growth_threshold - 1.3).abs() < f32::EPSILON);

        let empty = ControllerConfig::from_toml_str("").unwrap();
        assert_eq!(empty, ControllerConfig::default());
    }

    #[test]
    fn test_threshold_below_one_rejected() {
        let result = ControllerConfig::from_toml_str("growth_threshold = 0.8\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("quality.toml");

        let config = ControllerConfig::new(15, 1.5);
        config.save_to(&path).unwrap();

        let loaded = ControllerConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = ControllerConfig::load_from(&temp_dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
