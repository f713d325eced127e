//! Indicator calculator: SMA, EMA and ATR series.
//!
//! Indicators are pure functions: bar history in, numeric series of the same
//! length out. Undefined warmup values are `f64::NAN`. They are computed once
//! per run before the signal scan, never recomputed per bar.

pub mod atr;
pub mod ema;
pub mod sma;

pub use atr::{true_range, Atr};
pub use ema::{ema_of_series, Ema};
pub use sma::{sma_of_series, Sma};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::EngineConfig;
use crate::domain::Bar;
use crate::error::EngineError;

/// Trait for indicators.
///
/// # Look-ahead guard
/// No value at bar t may depend on bars after t. Computing on a truncated
/// series must reproduce the prefix of the full-series output.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of leading NaN values.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Moving average family, applied to both the fast and slow lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaType {
    #[default]
    Ema,
    Sma,
}

impl MaType {
    pub fn indicator(self, period: usize) -> Box<dyn Indicator> {
        match self {
            MaType::Ema => Box::new(Ema::new(period)),
            MaType::Sma => Box::new(Sma::new(period)),
        }
    }
}

impl FromStr for MaType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ema" => Ok(MaType::Ema),
            "sma" => Ok(MaType::Sma),
            other => Err(EngineError::invalid(format!(
                "unknown ma_type '{other}' (expected ema or sma)"
            ))),
        }
    }
}

impl fmt::Display for MaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaType::Ema => write!(f, "ema"),
            MaType::Sma => write!(f, "sma"),
        }
    }
}

/// The three series one engine run reads.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub fast: Vec<f64>,
    pub slow: Vec<f64>,
    pub atr: Vec<f64>,
}

impl IndicatorSet {
    pub fn compute(bars: &[Bar], config: &EngineConfig) -> Self {
        let fast = config.ma_type.indicator(config.fast_period);
        let slow = config.ma_type.indicator(config.slow_period);
        let atr = Atr::new(config.atr_period);
        Self {
            fast: fast.compute(bars),
            slow: slow.compute(bars),
            atr: atr.compute(bars),
        }
    }

    /// `(fast, slow, atr)` at `index`, or None if any is undefined.
    pub fn at(&self, index: usize) -> Option<(f64, f64, f64)> {
        let (fast, slow) = self.ma_at(index)?;
        let atr = *self.atr.get(index)?;
        if atr.is_nan() {
            return None;
        }
        Some((fast, slow, atr))
    }

    /// `(fast, slow)` at `index`, or None if either is undefined.
    pub fn ma_at(&self, index: usize) -> Option<(f64, f64)> {
        let fast = *self.fast.get(index)?;
        let slow = *self.slow.get(index)?;
        if fast.is_nan() || slow.is_nan() {
            return None;
        }
        Some((fast, slow))
    }
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
