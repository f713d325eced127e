//! Performance analyzer: trade list in, aggregate metrics and equity curve out.
//!
//! All functions are pure. Drawdown here is measured on cumulative realized
//! trade P&L, which can differ from an equity-curve drawdown.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, PositionSide, Trade};

/// Aggregate metrics for one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub long_trades: usize,
    pub short_trades: usize,
    pub reentry_trades: usize,
    /// Percent of trades with `pnl > 0`.
    pub win_rate: f64,
    pub total_pnl: f64,
    pub total_return_percent: f64,
    /// Mean holding period in calendar days.
    pub avg_trade_duration: f64,
    pub avg_win: f64,
    /// Mean P&L of losing trades (negative).
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// Peak-to-trough of cumulative realized P&L, in currency.
    pub max_drawdown: f64,
    pub max_drawdown_percent: f64,
    /// Per-trade return Sharpe, unannualized.
    pub sharpe_ratio: f64,
    pub final_capital: f64,
}

/// Account value on one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityCurvePoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone)]
pub struct PerformanceAnalyzer {
    initial_capital: f64,
}

impl PerformanceAnalyzer {
    pub fn new(initial_capital: f64) -> Self {
        Self { initial_capital }
    }

    pub fn analyze(&self, trades: &[Trade]) -> PerformanceMetrics {
        let total_trades = trades.len();
        let wins: Vec<f64> = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).collect();
        let losses: Vec<f64> = trades.iter().filter(|t| t.pnl < 0.0).map(|t| t.pnl).collect();
        let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
        let max_drawdown = realized_max_drawdown(trades);

        PerformanceMetrics {
            total_trades,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            long_trades: count_side(trades, PositionSide::Long),
            short_trades: count_side(trades, PositionSide::Short),
            reentry_trades: trades.iter().filter(|t| t.is_reentry).count(),
            win_rate: ratio_percent(wins.len() as f64, total_trades as f64),
            total_pnl,
            total_return_percent: ratio_percent(total_pnl, self.initial_capital),
            avg_trade_duration: mean(
                &trades
                    .iter()
                    .map(|t| t.duration_days as f64)
                    .collect::<Vec<_>>(),
            ),
            avg_win: mean(&wins),
            avg_loss: mean(&losses),
            largest_win: wins.iter().copied().fold(0.0, f64::max),
            largest_loss: losses.iter().copied().fold(0.0, f64::min),
            max_drawdown,
            max_drawdown_percent: ratio_percent(max_drawdown, self.initial_capital),
            sharpe_ratio: trade_sharpe(trades),
            final_capital: self.initial_capital + total_pnl,
        }
    }

    /// One point per bar. Equity steps by a trade's P&L on its exit date only.
    pub fn equity_curve(&self, bars: &[Bar], trades: &[Trade]) -> Vec<EquityCurvePoint> {
        let mut exits = trades.iter().peekable();
        let mut equity = self.initial_capital;
        bars.iter()
            .map(|bar| {
                while let Some(trade) = exits.peek() {
                    if trade.exit_date > bar.date {
                        break;
                    }
                    equity += trade.pnl;
                    exits.next();
                }
                EquityCurvePoint {
                    date: bar.date,
                    equity,
                }
            })
            .collect()
    }
}

/// Largest drop of cumulative trade P&L from its running peak (starting at 0).
pub fn realized_max_drawdown(trades: &[Trade]) -> f64 {
    let mut cumulative = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for trade in trades {
        cumulative += trade.pnl;
        peak = peak.max(cumulative);
        max_dd = max_dd.max(peak - cumulative);
    }
    max_dd
}

/// Mean over sample stdev of per-trade percentage returns, rounded to 2dp.
///
/// Zero with fewer than two trades or no dispersion.
pub fn trade_sharpe(trades: &[Trade]) -> f64 {
    if trades.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = trades.iter().map(Trade::return_pct).collect();
    let std = sample_std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    round2(mean(&returns) / std)
}

fn count_side(trades: &[Trade], side: PositionSide) -> usize {
    trades.iter().filter(|t| t.position_side == side).count()
}

fn ratio_percent(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        return 0.0;
    }
    num / den * 100.0
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (N-1).
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExitReason;
    use crate::executor::annotate_running;
    use crate::indicators::make_bars;

    fn trade(entry: usize, exit: usize, entry_price: f64, exit_price: f64, side: PositionSide) -> Trade {
        let bars = make_bars(&vec![100.0; exit + 1]);
        let shares = 10;
        let pnl = side.sign() * shares as f64 * (exit_price - entry_price);
        Trade {
            position_side: side,
            signal_date: bars[entry.saturating_sub(1)].date,
            entry_index: entry,
            entry_date: bars[entry].date,
            entry_price,
            shares,
            is_reentry: false,
            reentry_count: 0,
            exit_index: exit,
            exit_date: bars[exit].date,
            exit_price,
            exit_reason: ExitReason::FastMaCross,
            pnl,
            pnl_percent: pnl / (entry_price * shares as f64) * 100.0,
            duration_days: (exit - entry) as i64,
            running_pnl: 0.0,
            running_capital: 0.0,
            drawdown_percent: 0.0,
        }
    }

    #[test]
    fn empty_trades_give_zeroed_metrics() {
        let m = PerformanceAnalyzer::new(100_000.0).analyze(&[]);
        assert_eq!(m.total_trades, 0);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.final_capital, 100_000.0);
    }

    #[test]
    fn counts_and_rates() {
        let mut short = trade(6, 8, 100.0, 90.0, PositionSide::Short);
        short.is_reentry = true;
        let trades = vec![
            trade(1, 3, 100.0, 110.0, PositionSide::Long), // +100
            trade(4, 5, 100.0, 95.0, PositionSide::Long),  // -50
            short,                                         // +100
        ];
        let m = PerformanceAnalyzer::new(100_000.0).analyze(&trades);
        assert_eq!(m.total_trades, 3);
        assert_eq!(m.winning_trades, 2);
        assert_eq!(m.losing_trades, 1);
        assert_eq!(m.long_trades, 2);
        assert_eq!(m.short_trades, 1);
        assert_eq!(m.reentry_trades, 1);
        assert!((m.win_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!((m.total_pnl - 150.0).abs() < 1e-9);
        assert!((m.total_return_percent - 0.15).abs() < 1e-9);
        assert!((m.avg_win - 100.0).abs() < 1e-9);
        assert!((m.avg_loss + 50.0).abs() < 1e-9);
        assert_eq!(m.largest_win, 100.0);
        assert_eq!(m.largest_loss, -50.0);
        assert!((m.avg_trade_duration - 5.0 / 3.0).abs() < 1e-9);
        assert!((m.final_capital - 100_150.0).abs() < 1e-9);
    }

    #[test]
    fn break_even_trade_is_neither_win_nor_loss() {
        let trades = vec![
            trade(1, 3, 100.0, 100.0, PositionSide::Long),
            trade(4, 6, 100.0, 104.0, PositionSide::Long),
        ];
        let m = PerformanceAnalyzer::new(100_000.0).analyze(&trades);
        assert_eq!(m.winning_trades, 1);
        assert_eq!(m.losing_trades, 0);
        assert!((m.win_rate - 50.0).abs() < 1e-9);
        assert!((m.avg_win - 40.0).abs() < 1e-9);
    }

    #[test]
    fn realized_drawdown_from_cumulative_pnl() {
        let trades = vec![
            trade(1, 2, 100.0, 110.0, PositionSide::Long), // +100, cum 100
            trade(3, 4, 100.0, 80.0, PositionSide::Long),  // -200, cum -100
            trade(5, 6, 100.0, 105.0, PositionSide::Long), // +50, cum -50
        ];
        let m = PerformanceAnalyzer::new(100_000.0).analyze(&trades);
        assert!((m.max_drawdown - 200.0).abs() < 1e-9);
        assert!((m.max_drawdown_percent - 0.2).abs() < 1e-9);
    }

    #[test]
    fn drawdown_counts_losses_before_any_gain() {
        let trades = vec![trade(1, 2, 100.0, 90.0, PositionSide::Long)];
        assert!((realized_max_drawdown(&trades) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn sharpe_uses_sample_stdev_and_rounds() {
        // Returns 10%, -5%, 10%: mean 5, sample std = sqrt(75) = 8.660...
        let trades = vec![
            trade(1, 2, 100.0, 110.0, PositionSide::Long),
            trade(3, 4, 100.0, 95.0, PositionSide::Long),
            trade(5, 6, 100.0, 110.0, PositionSide::Long),
        ];
        let sharpe = trade_sharpe(&trades);
        assert_eq!(sharpe, round2(5.0 / 75.0_f64.sqrt()));
        assert_eq!(sharpe, 0.58);
    }

    #[test]
    fn sharpe_zero_for_single_trade_or_no_dispersion() {
        let one = vec![trade(1, 2, 100.0, 110.0, PositionSide::Long)];
        assert_eq!(trade_sharpe(&one), 0.0);
        let same = vec![
            trade(1, 2, 100.0, 110.0, PositionSide::Long),
            trade(3, 4, 100.0, 110.0, PositionSide::Long),
        ];
        assert_eq!(trade_sharpe(&same), 0.0);
    }

    #[test]
    fn equity_steps_only_on_exit_dates() {
        let bars = make_bars(&vec![100.0; 8]);
        let mut trades = vec![
            trade(1, 3, 100.0, 110.0, PositionSide::Long),
            trade(4, 6, 100.0, 95.0, PositionSide::Long),
        ];
        annotate_running(&mut trades, 1_000.0);
        let curve = PerformanceAnalyzer::new(1_000.0).equity_curve(&bars, &trades);
        let equity: Vec<f64> = curve.iter().map(|p| p.equity).collect();
        assert_eq!(
            equity,
            vec![1_000.0, 1_000.0, 1_000.0, 1_100.0, 1_100.0, 1_100.0, 1_050.0, 1_050.0]
        );
        assert_eq!(curve.len(), bars.len());
        assert_eq!(curve[3].date, bars[3].date);
    }
}
