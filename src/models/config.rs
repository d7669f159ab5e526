use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SadError;

/// Numeric settings shared by every model fit.
///
/// Any field omitted from a TOML config file keeps its default:
///
/// ```toml
/// tolerance = 1e-12
/// grid_samples = 5000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Absolute tolerance for Brent's method
    pub tolerance: f64,
    /// Iteration cap for Brent's method
    pub max_iterations: usize,
    /// Evenly spaced samples scanned when the direct bracket fails
    pub grid_samples: usize,
    /// Absolute tolerance of each adaptive Simpson panel (lognormal model)
    pub integration_tolerance: f64,
    /// Maximum recursion depth of adaptive Simpson before giving up
    pub max_integration_depth: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 200,
            grid_samples: 1000,
            integration_tolerance: 1e-10,
            max_integration_depth: 40,
        }
    }
}

impl SolverConfig {
    /// Load a config from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SadError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse a config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SadError> {
        let config: SolverConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no solver could run with.
    pub fn validate(&self) -> Result<(), SadError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(SadError::InvalidParameters(format!(
                "tolerance must be positive (got {})",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(SadError::InvalidParameters(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.grid_samples < 3 {
            return Err(SadError::InvalidParameters(format!(
                "grid_samples must be at least 3 (got {})",
                self.grid_samples
            )));
        }
        if !(self.integration_tolerance.is_finite() && self.integration_tolerance > 0.0) {
            return Err(SadError::InvalidParameters(format!(
                "integration_tolerance must be positive (got {})",
                self.integration_tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_samples() {
        let config = SolverConfig::default();
        assert_eq!(config.grid_samples, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SolverConfig::from_toml_str("grid_samples = 5000\n").unwrap();
        assert_eq!(config.grid_samples, 5000);
        assert_eq!(config.max_iterations, SolverConfig::default().max_iterations);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = SolverConfig::from_toml_str("").unwrap();
        assert_eq!(config, SolverConfig::default());
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        let err = SolverConfig::from_toml_str("tolerance = -1.0\n").unwrap_err();
        assert!(matches!(err, SadError::InvalidParameters(_)));
    }

    #[test]
    fn test_tiny_grid_rejected() {
        assert!(SolverConfig::from_toml_str("grid_samples = 2\n").is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = SolverConfig::from_toml_str("grid_samples = \"many\"\n").unwrap_err();
        assert!(matches!(err, SadError::Toml(_)));
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver.toml");
        std::fs::write(&path, "max_iterations = 50\nintegration_tolerance = 1e-8\n").unwrap();
        let config = SolverConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.max_iterations, 50);
        assert!((config.integration_tolerance - 1e-8).abs() < 1e-20);
    }
}
