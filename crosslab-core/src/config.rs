//! Engine configuration.
//!
//! One `EngineConfig` is immutable for the duration of a run. Every field has
//! a default so partial TOML tables deserialize cleanly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;
use crate::indicators::MaType;

/// Which sides the engine trades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    #[default]
    Long,
    Short,
    Both,
}

impl StrategyMode {
    pub fn trades_long(self) -> bool {
        matches!(self, StrategyMode::Long | StrategyMode::Both)
    }

    pub fn trades_short(self) -> bool {
        matches!(self, StrategyMode::Short | StrategyMode::Both)
    }
}

impl FromStr for StrategyMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(StrategyMode::Long),
            "short" => Ok(StrategyMode::Short),
            "both" => Ok(StrategyMode::Both),
            other => Err(EngineError::invalid(format!(
                "unknown strategy mode '{other}' (expected long, short or both)"
            ))),
        }
    }
}

impl fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyMode::Long => write!(f, "long"),
            StrategyMode::Short => write!(f, "short"),
            StrategyMode::Both => write!(f, "both"),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_capital: f64,
    pub atr_period: usize,
    pub atr_multiplier_long: f64,
    pub atr_multiplier_short: f64,
    pub ma_type: MaType,
    pub fast_period: usize,
    pub slow_period: usize,
    /// Percent distance above the fast MA that counts as overextended.
    pub mean_reversion_threshold: f64,
    /// Percent of available capital committed to a primary long entry.
    pub sizing_percent_long: f64,
    /// Percent of available capital committed to a primary short entry.
    pub sizing_percent_short: f64,
    pub strategy_mode: StrategyMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            atr_period: 14,
            atr_multiplier_long: 2.0,
            atr_multiplier_short: 1.5,
            ma_type: MaType::Ema,
            fast_period: 20,
            slow_period: 50,
            mean_reversion_threshold: 5.0,
            sizing_percent_long: 5.0,
            sizing_percent_short: 5.0,
            strategy_mode: StrategyMode::Long,
        }
    }
}

impl EngineConfig {
    /// Same configuration with a different MA pair.
    pub fn with_periods(&self, fast_period: usize, slow_period: usize) -> Self {
        Self {
            fast_period,
            slow_period,
            ..self.clone()
        }
    }

    /// First bar index at which every indicator the scan reads is defined.
    pub fn scan_start(&self) -> usize {
        self.slow_period.max(self.atr_period)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(EngineError::invalid(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if self.fast_period == 0 || self.slow_period == 0 || self.atr_period == 0 {
            return Err(EngineError::invalid("MA and ATR periods must be >= 1"));
        }
        if self.fast_period >= self.slow_period {
            return Err(EngineError::invalid(format!(
                "fast_period ({}) must be less than slow_period ({})",
                self.fast_period, self.slow_period
            )));
        }
        for (name, value) in [
            ("atr_multiplier_long", self.atr_multiplier_long),
            ("atr_multiplier_short", self.atr_multiplier_short),
            ("mean_reversion_threshold", self.mean_reversion_threshold),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(EngineError::invalid(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("sizing_percent_long", self.sizing_percent_long),
            ("sizing_percent_short", self.sizing_percent_short),
        ] {
            if !(value > 0.0 && value <= 100.0) {
                return Err(EngineError::invalid(format!(
                    "{name} must be in (0, 100], got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Deterministic content hash of this configuration.
    ///
    /// Two runs with identical configs share the same hash, which lets callers
    /// cache or deduplicate results.
    pub fn config_hash(&self) -> String {
        // Serializing plain numbers and enums to JSON cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
