//! MA-pair parameter optimizer: grid and explicit-pair sweeps.
//!
//! Every cell builds its own `Engine` from a cloned base config, so cells share
//! nothing and run under rayon when parallelism is enabled. A failing cell is
//! excluded from the ranking without aborting its siblings.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crosslab_core::{AnalysisResult, Bar, Engine, EngineConfig, EngineError};

use crate::heatmap::{Heatmap, HeatmapMetric};
use crate::metrics;

/// Minimum bar count for a grid sweep.
pub const MIN_OPTIMIZATION_BARS: usize = 100;

/// Fewer trades than this in every cell means the sweep cannot support a
/// recommendation.
pub const MIN_TRADES_FOR_RECOMMENDATION: usize = 3;

// ─── Grid ───────────────────────────────────────────────────────────

/// Inclusive integer period range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub min: usize,
    pub max: usize,
}

impl PeriodRange {
    pub fn new(min: usize, max: usize) -> Result<Self, EngineError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min == 0 {
            return Err(EngineError::invalid("period range minimum must be >= 1"));
        }
        if self.min >= self.max {
            return Err(EngineError::invalid(format!(
                "period range min ({}) must be less than max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<usize> {
        self.min..=self.max
    }
}

/// One fast/slow MA period combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MaPair {
    pub fast: usize,
    pub slow: usize,
}

impl MaPair {
    pub fn new(fast: usize, slow: usize) -> Result<Self, EngineError> {
        if fast == 0 || fast >= slow {
            return Err(EngineError::invalid(format!(
                "invalid MA pair {fast}/{slow}: need 0 < fast < slow"
            )));
        }
        Ok(Self { fast, slow })
    }

    pub fn distance(&self) -> usize {
        self.slow - self.fast
    }
}

impl fmt::Display for MaPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.fast, self.slow)
    }
}

impl FromStr for MaPair {
    type Err = EngineError;

    /// Parses `"fast/slow"` or `"fast:slow"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || EngineError::invalid(format!("malformed MA pair '{s}' (expected fast/slow)"));
        let (fast, slow) = s.trim().split_once(['/', ':']).ok_or_else(malformed)?;
        let fast: usize = fast.trim().parse().map_err(|_| malformed())?;
        let slow: usize = slow.trim().parse().map_err(|_| malformed())?;
        MaPair::new(fast, slow)
    }
}

/// Every `(fast, slow)` in range with `slow - fast >= min_distance`,
/// fast-major order.
pub fn generate_pairs(
    fast_range: &PeriodRange,
    slow_range: &PeriodRange,
    min_distance: usize,
) -> Result<Vec<MaPair>, EngineError> {
    fast_range.validate()?;
    slow_range.validate()?;

    let mut pairs = Vec::new();
    for fast in fast_range.iter() {
        for slow in slow_range.iter() {
            if slow > fast && slow - fast >= min_distance {
                pairs.push(MaPair { fast, slow });
            }
        }
    }

    if pairs.is_empty() {
        return Err(EngineError::invalid(format!(
            "no MA pairs satisfy fast {}..={}, slow {}..={}, min distance {min_distance}",
            fast_range.min, fast_range.max, slow_range.min, slow_range.max
        )));
    }
    Ok(pairs)
}

/// Parse explicit pair specs such as `["10/50", "20:100"]`.
pub fn parse_pairs<S: AsRef<str>>(specs: &[S]) -> Result<Vec<MaPair>, EngineError> {
    specs.iter().map(|s| s.as_ref().parse()).collect()
}

// ─── Results ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Outcome of one sweep cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub fast_period: usize,
    pub slow_period: usize,
    pub distance: usize,
    pub total_return_percent: f64,
    /// Annualized, risk-free adjusted.
    pub sharpe_ratio: f64,
    /// Equity-curve drawdown, positive percent.
    pub max_drawdown_percent: f64,
    pub win_rate: f64,
    /// Written as `null` in JSON when infinite.
    #[serde(with = "infinite_as_null")]
    pub profit_factor: f64,
    pub total_trades: usize,
    pub avg_trade_duration: f64,
    pub date_range: DateRange,
}

impl OptimizationResult {
    pub fn from_analysis(pair: MaPair, analysis: &AnalysisResult) -> Self {
        let m = &analysis.performance_metrics;
        Self {
            fast_period: pair.fast,
            slow_period: pair.slow,
            distance: pair.distance(),
            total_return_percent: m.total_return_percent,
            sharpe_ratio: metrics::sharpe_ratio(&analysis.trades),
            max_drawdown_percent: metrics::max_drawdown_percent(&analysis.equity_curve),
            win_rate: m.win_rate,
            profit_factor: metrics::profit_factor(&analysis.trades),
            total_trades: m.total_trades,
            avg_trade_duration: m.avg_trade_duration,
            date_range: DateRange {
                start: analysis.start_date,
                end: analysis.end_date,
            },
        }
    }

    pub fn pair(&self) -> MaPair {
        MaPair {
            fast: self.fast_period,
            slow: self.slow_period,
        }
    }
}

/// Ranked output of a grid sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationSummary {
    pub symbol: String,
    pub bar_count: usize,
    pub date_range: DateRange,
    pub pairs_tested: usize,
    pub pairs_skipped: usize,
    /// Best first.
    pub results: Vec<OptimizationResult>,
}

impl OptimizationSummary {
    pub fn best(&self) -> Option<&OptimizationResult> {
        self.results.first()
    }

    pub fn top(&self, n: usize) -> &[OptimizationResult] {
        &self.results[..n.min(self.results.len())]
    }

    pub fn ranked(&self) -> &[OptimizationResult] {
        &self.results
    }

    pub fn heatmap(&self, metric: HeatmapMetric) -> Heatmap {
        Heatmap::from_results(&self.results, metric)
    }
}

/// Sort by total return, best first; ties by `(fast, slow)` ascending.
pub fn rank(results: &mut [OptimizationResult]) {
    results.sort_by(|a, b| {
        b.total_return_percent
            .total_cmp(&a.total_return_percent)
            .then_with(|| a.pair().cmp(&b.pair()))
    });
}

/// JSON has no infinity; profit factor round-trips `+inf` through `null`.
mod infinite_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

// ─── Optimizer ──────────────────────────────────────────────────────

/// Parameter optimizer over MA pairs.
///
/// Runs one independent engine per pair, optionally in parallel.
#[derive(Debug, Clone)]
pub struct ParameterOptimizer {
    base_config: EngineConfig,
    parallel: bool,
}

impl ParameterOptimizer {
    /// Creates an optimizer. Every setting except the MA periods comes from
    /// `base_config`.
    pub fn new(base_config: EngineConfig) -> Self {
        Self {
            base_config,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn base_config(&self) -> &EngineConfig {
        &self.base_config
    }

    /// Run one pair through a fresh engine.
    pub fn evaluate_pair(
        &self,
        bars: &[Bar],
        symbol: &str,
        pair: MaPair,
    ) -> Result<OptimizationResult, EngineError> {
        let engine = Engine::new(self.base_config.with_periods(pair.fast, pair.slow))?;
        let analysis = engine.run_analysis(bars, symbol)?;
        Ok(OptimizationResult::from_analysis(pair, &analysis))
    }

    /// Sweep the full grid and rank the surviving cells.
    ///
    /// # Errors
    /// - `InsufficientData` with fewer than 100 bars
    /// - `InvalidConfiguration` for malformed ranges or an empty grid
    /// - `NoSignalsGenerated` if no cell produced a trade
    /// - `InsufficientActivity` if no cell reached 3 trades
    pub fn optimize_ma_pairs(
        &self,
        bars: &[Bar],
        symbol: &str,
        fast_range: PeriodRange,
        slow_range: PeriodRange,
        min_distance: usize,
    ) -> Result<OptimizationSummary, EngineError> {
        if bars.len() < MIN_OPTIMIZATION_BARS {
            return Err(EngineError::InsufficientData {
                required: MIN_OPTIMIZATION_BARS,
                actual: bars.len(),
            });
        }
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(EngineError::InsufficientData {
                required: MIN_OPTIMIZATION_BARS,
                actual: 0,
            });
        };

        let pairs = generate_pairs(&fast_range, &slow_range, min_distance)?;
        let pairs_tested = pairs.len();
        let results = self.sweep(bars, symbol, &pairs)?;

        let most_trades = results.iter().map(|r| r.total_trades).max().unwrap_or(0);
        if most_trades < MIN_TRADES_FOR_RECOMMENDATION {
            return Err(EngineError::InsufficientActivity {
                trades: most_trades,
                required: MIN_TRADES_FOR_RECOMMENDATION,
            });
        }

        let summary = OptimizationSummary {
            symbol: symbol.to_string(),
            bar_count: bars.len(),
            date_range: DateRange {
                start: first.date,
                end: last.date,
            },
            pairs_tested,
            pairs_skipped: pairs_tested - results.len(),
            results,
        };

        if let Some(best) = summary.best() {
            info!(
                symbol,
                tested = summary.pairs_tested,
                skipped = summary.pairs_skipped,
                best = %best.pair(),
                return_pct = best.total_return_percent,
                "optimization complete"
            );
        }
        Ok(summary)
    }

    /// Evaluate an explicit list of pairs, ranked like a grid sweep.
    pub fn compare_pairs(
        &self,
        bars: &[Bar],
        symbol: &str,
        pairs: &[MaPair],
    ) -> Result<Vec<OptimizationResult>, EngineError> {
        if pairs.is_empty() {
            return Err(EngineError::invalid("no MA pairs to compare"));
        }
        let results = self.sweep(bars, symbol, pairs)?;
        info!(
            symbol,
            requested = pairs.len(),
            evaluated = results.len(),
            "pair comparison complete"
        );
        Ok(results)
    }

    /// Evaluate every pair, drop failures, and rank the rest.
    ///
    /// Fails only when every cell fails: with `NoSignalsGenerated` if all of
    /// them were zero-trade cells, otherwise with the first cell error.
    fn sweep(
        &self,
        bars: &[Bar],
        symbol: &str,
        pairs: &[MaPair],
    ) -> Result<Vec<OptimizationResult>, EngineError> {
        let evaluate = |pair: &MaPair| {
            let outcome = self.evaluate_pair(bars, symbol, *pair);
            if let Err(e) = &outcome {
                debug!(pair = %pair, error = %e, "pair skipped");
            }
            outcome
        };

        let outcomes: Vec<Result<OptimizationResult, EngineError>> = if self.parallel {
            pairs.par_iter().map(evaluate).collect()
        } else {
            pairs.iter().map(evaluate).collect()
        };

        let mut results = Vec::with_capacity(outcomes.len());
        let mut first_error = None;
        let mut all_zero_trade = true;
        for outcome in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    if e != EngineError::NoSignalsGenerated {
                        all_zero_trade = false;
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        if results.is_empty() {
            return Err(match first_error {
                Some(_) if all_zero_trade => EngineError::NoSignalsGenerated,
                Some(e) => e,
                None => EngineError::NoSignalsGenerated,
            });
        }

        rank(&mut results);
        Ok(results)
    }
}
