//! TOML configuration for analysis and optimization runs.
//!
//! ```toml
//! [engine]
//! fast_period = 10
//! slow_period = 40
//! strategy_mode = "both"
//!
//! [optimizer]
//! fast_min = 5
//! fast_max = 20
//! slow_min = 30
//! slow_max = 100
//! min_distance = 10
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crosslab_core::{EngineConfig, EngineError};

use crate::optimizer::PeriodRange;

/// Errors from reading, parsing, or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Invalid(#[from] EngineError),
}

/// Grid bounds and sweep settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub fast_min: usize,
    pub fast_max: usize,
    pub slow_min: usize,
    pub slow_max: usize,
    pub min_distance: usize,
    pub parallel: bool,
    /// Rows shown in summaries.
    pub top_n: usize,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            fast_min: 5,
            fast_max: 30,
            slow_min: 20,
            slow_max: 100,
            min_distance: 10,
            parallel: true,
            top_n: 5,
        }
    }
}

impl OptimizerSettings {
    pub fn fast_range(&self) -> Result<PeriodRange, EngineError> {
        PeriodRange::new(self.fast_min, self.fast_max)
    }

    pub fn slow_range(&self) -> Result<PeriodRange, EngineError> {
        PeriodRange::new(self.slow_min, self.slow_max)
    }
}

/// Top-level config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossLabConfig {
    pub engine: EngineConfig,
    pub optimizer: OptimizerSettings,
}

impl CrossLabConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.engine.validate()?;
        self.optimizer.fast_range()?;
        self.optimizer.slow_range()?;
        Ok(())
    }
}
