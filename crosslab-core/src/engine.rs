//! Engine: one validated configuration, many independent analyses.
//!
//! `run_analysis` takes `&self` and keeps every piece of per-run state on its
//! own stack, so a single engine can serve repeated or concurrent calls.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alerts::MeanReversionAlertDetector;
use crate::config::EngineConfig;
use crate::domain::bar::first_unordered;
use crate::domain::{Bar, MeanReversionAlert, Signal, Trade};
use crate::error::EngineError;
use crate::executor::TradeExecutor;
use crate::indicators::IndicatorSet;
use crate::performance::{EquityCurvePoint, PerformanceAnalyzer, PerformanceMetrics};
use crate::signal::generate_signals;

/// Everything one analysis produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Calendar days from first to last bar.
    pub total_days: i64,
    pub config: EngineConfig,
    pub config_hash: String,
    pub trades: Vec<Trade>,
    /// Most recent first.
    pub signals: Vec<Signal>,
    pub mean_reversion_alerts: Vec<MeanReversionAlert>,
    pub performance_metrics: PerformanceMetrics,
    pub equity_curve: Vec<EquityCurvePoint>,
}

#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    config_hash: String,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let config_hash = config.config_hash();
        Ok(Self {
            config,
            config_hash,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    /// Run the full pipeline over `bars`.
    ///
    /// # Errors
    /// - `InsufficientData` if there are fewer bars than `slow_period`
    /// - `UnsortedBars` if dates are not strictly ascending
    /// - `NoSignalsGenerated` if no trade was opened
    pub fn run_analysis(&self, bars: &[Bar], symbol: &str) -> Result<AnalysisResult, EngineError> {
        let cfg = &self.config;
        if bars.len() < cfg.slow_period {
            return Err(EngineError::InsufficientData {
                required: cfg.slow_period,
                actual: bars.len(),
            });
        }
        if let Some(index) = first_unordered(bars) {
            return Err(EngineError::UnsortedBars { index });
        }
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(EngineError::InsufficientData {
                required: cfg.slow_period.max(1),
                actual: 0,
            });
        };

        let indicators = IndicatorSet::compute(bars, cfg);
        let mut signals = generate_signals(bars, &indicators, cfg);
        let trades = TradeExecutor::new(cfg).execute(bars, &signals);

        debug!(
            symbol,
            bars = bars.len(),
            fast = cfg.fast_period,
            slow = cfg.slow_period,
            signals = signals.len(),
            trades = trades.len(),
            "analysis pass complete"
        );

        if trades.is_empty() {
            return Err(EngineError::NoSignalsGenerated);
        }

        let mean_reversion_alerts = MeanReversionAlertDetector::new(cfg.mean_reversion_threshold)
            .detect(bars, &indicators.fast, &trades);
        let analyzer = PerformanceAnalyzer::new(cfg.initial_capital);
        let performance_metrics = analyzer.analyze(&trades);
        let equity_curve = analyzer.equity_curve(bars, &trades);

        signals.reverse();

        Ok(AnalysisResult {
            symbol: symbol.to_string(),
            start_date: first.date,
            end_date: last.date,
            total_days: (last.date - first.date).num_days(),
            config: cfg.clone(),
            config_hash: self.config_hash.clone(),
            trades,
            signals,
            mean_reversion_alerts,
            performance_metrics,
            equity_curve,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_bars, MaType};

    fn sma_config() -> EngineConfig {
        EngineConfig {
            ma_type: MaType::Sma,
            fast_period: 5,
            slow_period: 10,
            atr_period: 5,
            ..EngineConfig::default()
        }
    }

    fn flat_then_rising(flat: usize, rising: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..flat)
            .map(|_| 100.0)
            .chain((1..=rising).map(|i| 100.0 + i as f64))
            .collect();
        make_bars(&closes)
    }

    #[test]
    fn new_rejects_invalid_config() {
        let cfg = EngineConfig::default().with_periods(30, 30);
        assert!(matches!(
            Engine::new(cfg),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn too_few_bars_is_insufficient_data() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let bars = make_bars(&[100.0; 49]);
        assert_eq!(
            engine.run_analysis(&bars, "TEST").unwrap_err(),
            EngineError::InsufficientData {
                required: 50,
                actual: 49
            }
        );
    }

    #[test]
    fn unsorted_bars_are_rejected() {
        let engine = Engine::new(sma_config()).unwrap();
        let mut bars = flat_then_rising(20, 20);
        bars.swap(10, 11);
        assert_eq!(
            engine.run_analysis(&bars, "TEST").unwrap_err(),
            EngineError::UnsortedBars { index: 11 }
        );
    }

    #[test]
    fn flat_series_has_no_signals() {
        let engine = Engine::new(sma_config()).unwrap();
        let bars = make_bars(&[100.0; 40]);
        assert_eq!(
            engine.run_analysis(&bars, "FLAT").unwrap_err(),
            EngineError::NoSignalsGenerated
        );
    }

    #[test]
    fn result_is_populated_and_signals_descend() {
        let engine = Engine::new(sma_config()).unwrap();
        let bars = flat_then_rising(20, 20);
        let result = engine.run_analysis(&bars, "UP").unwrap();
        assert_eq!(result.symbol, "UP");
        assert_eq!(result.start_date, bars[0].date);
        assert_eq!(result.end_date, bars[39].date);
        assert_eq!(result.total_days, 39);
        assert_eq!(result.config_hash, engine.config_hash());
        assert_eq!(result.equity_curve.len(), bars.len());
        assert!(!result.trades.is_empty());
        assert!(result
            .signals
            .windows(2)
            .all(|w| w[0].date >= w[1].date));
        assert_eq!(result.performance_metrics.total_trades, result.trades.len());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let engine = Engine::new(sma_config()).unwrap();
        let bars = flat_then_rising(20, 20);
        let a = engine.run_analysis(&bars, "UP").unwrap();
        let b = engine.run_analysis(&bars, "UP").unwrap();
        assert_eq!(a.performance_metrics, b.performance_metrics);
        assert_eq!(a.trades.len(), b.trades.len());
    }
}
