//! Heatmap: one optimizer metric laid out on a fast × slow grid.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crosslab_core::EngineError;

use crate::optimizer::OptimizationResult;

/// Which metric a heatmap cell shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatmapMetric {
    #[default]
    TotalReturn,
    Sharpe,
    MaxDrawdown,
    WinRate,
    ProfitFactor,
    TotalTrades,
}

impl HeatmapMetric {
    pub const ALL: [HeatmapMetric; 6] = [
        Self::TotalReturn,
        Self::Sharpe,
        Self::MaxDrawdown,
        Self::WinRate,
        Self::ProfitFactor,
        Self::TotalTrades,
    ];

    /// Extract the relevant value from an optimization result.
    pub fn extract(&self, result: &OptimizationResult) -> f64 {
        match self {
            Self::TotalReturn => result.total_return_percent,
            Self::Sharpe => result.sharpe_ratio,
            Self::MaxDrawdown => result.max_drawdown_percent,
            Self::WinRate => result.win_rate,
            Self::ProfitFactor => result.profit_factor,
            Self::TotalTrades => result.total_trades as f64,
        }
    }

    /// Drawdown is a positive percentage here, so smaller is better.
    pub fn is_higher_better(&self) -> bool {
        !matches!(self, Self::MaxDrawdown)
    }

    /// Returns true if `a` is better than `b` for this metric.
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        if self.is_higher_better() {
            a > b
        } else {
            a < b
        }
    }
}

impl FromStr for HeatmapMetric {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "total_return" | "return" => Ok(Self::TotalReturn),
            "sharpe" | "sharpe_ratio" => Ok(Self::Sharpe),
            "max_drawdown" | "drawdown" => Ok(Self::MaxDrawdown),
            "win_rate" => Ok(Self::WinRate),
            "profit_factor" => Ok(Self::ProfitFactor),
            "total_trades" | "trades" => Ok(Self::TotalTrades),
            other => Err(EngineError::invalid(format!("unknown heatmap metric '{other}'"))),
        }
    }
}

impl fmt::Display for HeatmapMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TotalReturn => "total_return",
            Self::Sharpe => "sharpe",
            Self::MaxDrawdown => "max_drawdown",
            Self::WinRate => "win_rate",
            Self::ProfitFactor => "profit_factor",
            Self::TotalTrades => "total_trades",
        };
        f.write_str(name)
    }
}

/// `cells[i][j]` holds the metric for `(fast_periods[i], slow_periods[j])`,
/// or `None` where no result exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heatmap {
    pub metric: HeatmapMetric,
    pub fast_periods: Vec<usize>,
    pub slow_periods: Vec<usize>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl Heatmap {
    pub fn from_results(results: &[OptimizationResult], metric: HeatmapMetric) -> Self {
        let mut fast_periods: Vec<usize> = results.iter().map(|r| r.fast_period).collect();
        fast_periods.sort_unstable();
        fast_periods.dedup();
        let mut slow_periods: Vec<usize> = results.iter().map(|r| r.slow_period).collect();
        slow_periods.sort_unstable();
        slow_periods.dedup();

        let mut cells = vec![vec![None; slow_periods.len()]; fast_periods.len()];
        for r in results {
            if let (Ok(i), Ok(j)) = (
                fast_periods.binary_search(&r.fast_period),
                slow_periods.binary_search(&r.slow_period),
            ) {
                cells[i][j] = Some(metric.extract(r));
            }
        }

        Self {
            metric,
            fast_periods,
            slow_periods,
            cells,
        }
    }

    pub fn get(&self, fast: usize, slow: usize) -> Option<f64> {
        let i = self.fast_periods.binary_search(&fast).ok()?;
        let j = self.slow_periods.binary_search(&slow).ok()?;
        self.cells[i][j]
    }

    /// Best populated cell as `(fast, slow, value)`.
    pub fn best(&self) -> Option<(usize, usize, f64)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for (i, row) in self.cells.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                let Some(value) = *cell else { continue };
                if best.map_or(true, |(_, _, b)| self.metric.is_better(value, b)) {
                    best = Some((self.fast_periods[i], self.slow_periods[j], value));
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::DateRange;
    use chrono::NaiveDate;

    fn result(fast: usize, slow: usize, ret: f64, dd: f64) -> OptimizationResult {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        OptimizationResult {
            fast_period: fast,
            slow_period: slow,
            distance: slow - fast,
            total_return_percent: ret,
            sharpe_ratio: 1.0,
            max_drawdown_percent: dd,
            win_rate: 50.0,
            profit_factor: 1.5,
            total_trades: 4,
            avg_trade_duration: 10.0,
            date_range: DateRange { start: d, end: d },
        }
    }

    #[test]
    fn grid_places_cells_and_leaves_gaps() {
        let results = vec![
            result(5, 20, 2.0, 3.0),
            result(5, 30, 4.0, 6.0),
            result(10, 30, -1.0, 1.0),
        ];
        let map = Heatmap::from_results(&results, HeatmapMetric::TotalReturn);
        assert_eq!(map.fast_periods, vec![5, 10]);
        assert_eq!(map.slow_periods, vec![20, 30]);
        assert_eq!(map.get(5, 30), Some(4.0));
        assert_eq!(map.get(10, 20), None);
        assert_eq!(map.get(7, 20), None);
    }

    #[test]
    fn best_respects_metric_direction() {
        let results = vec![
            result(5, 20, 2.0, 3.0),
            result(5, 30, 4.0, 6.0),
            result(10, 30, -1.0, 1.0),
        ];
        let by_return = Heatmap::from_results(&results, HeatmapMetric::TotalReturn);
        assert_eq!(by_return.best(), Some((5, 30, 4.0)));
        let by_dd = Heatmap::from_results(&results, HeatmapMetric::MaxDrawdown);
        assert_eq!(by_dd.best(), Some((10, 30, 1.0)));
    }

    #[test]
    fn metric_parses_and_displays() {
        for metric in HeatmapMetric::ALL {
            assert_eq!(metric.to_string().parse::<HeatmapMetric>().unwrap(), metric);
        }
        assert_eq!("Sharpe-Ratio".parse::<HeatmapMetric>().unwrap(), HeatmapMetric::Sharpe);
        assert!("sortino".parse::<HeatmapMetric>().is_err());
    }

    #[test]
    fn empty_results_give_empty_map() {
        let map = Heatmap::from_results(&[], HeatmapMetric::Sharpe);
        assert!(map.cells.is_empty());
        assert_eq!(map.best(), None);
    }
}
