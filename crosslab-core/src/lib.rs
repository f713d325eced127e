//! CrossLab Core: MA-crossover signal engine.
//!
//! This crate contains the analysis pipeline:
//! - Domain types (bars, signals, trades, alerts)
//! - Indicators (SMA, EMA, ATR) behind the `Indicator` trait
//! - Sign-parameterized crossover state machine for long and short sides
//! - Next-bar-open trade executor with integer share sizing
//! - Mean-reversion alert detector
//! - Performance analyzer and equity curve
//!
//! The engine performs no I/O: bars and config in, `AnalysisResult` out.

pub mod alerts;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod executor;
pub mod indicators;
pub mod performance;
pub mod signal;

pub use config::{EngineConfig, StrategyMode};
pub use domain::{Bar, ExitReason, MeanReversionAlert, PositionSide, Signal, SignalKind, Trade};
pub use engine::{AnalysisResult, Engine};
pub use error::EngineError;
pub use indicators::{IndicatorSet, MaType};
pub use performance::{EquityCurvePoint, PerformanceMetrics};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the optimizer shares across rayon
    /// workers is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Bar>();
        require_sync::<Bar>();
        require_send::<Signal>();
        require_sync::<Signal>();
        require_send::<Trade>();
        require_sync::<Trade>();
        require_send::<MeanReversionAlert>();
        require_sync::<MeanReversionAlert>();
        require_send::<EngineConfig>();
        require_sync::<EngineConfig>();
        require_send::<Engine>();
        require_sync::<Engine>();
        require_send::<AnalysisResult>();
        require_sync::<AnalysisResult>();
        require_send::<EngineError>();
        require_sync::<EngineError>();
        require_send::<Box<dyn indicators::Indicator>>();
        require_sync::<Box<dyn indicators::Indicator>>();
    }
}
