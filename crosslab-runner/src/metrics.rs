//! Optimizer metrics: pure functions computed per sweep cell.
//!
//! These complement the engine's own `PerformanceMetrics`. The Sharpe ratio
//! here is annualized and risk-free adjusted, and drawdown is measured on the
//! equity curve rather than on cumulative realized P&L.

use crosslab_core::performance::{mean, round2, sample_std_dev};
use crosslab_core::{EquityCurvePoint, Trade};

/// Annual risk-free rate subtracted from every per-trade return.
pub const RISK_FREE_RATE: f64 = 0.02;

/// Trading days per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Annualized Sharpe ratio over per-trade returns.
///
/// Sharpe = mean(r - rf/252) / std(r - rf/252) * sqrt(252), with `r` the
/// fractional return of each trade on its cost basis. Rounded to 2 decimals.
/// Returns 0.0 with fewer than 2 trades or zero variance.
pub fn sharpe_ratio(trades: &[Trade]) -> f64 {
    if trades.len() < 2 {
        return 0.0;
    }
    let daily_rf = RISK_FREE_RATE / TRADING_DAYS;
    let excess: Vec<f64> = trades
        .iter()
        .map(|t| t.return_pct() / 100.0 - daily_rf)
        .collect();
    let std = sample_std_dev(&excess);
    if std < 1e-15 {
        return 0.0;
    }
    round2(mean(&excess) / std * TRADING_DAYS.sqrt())
}

/// Peak-to-trough decline of the equity curve, as a positive percentage.
pub fn max_drawdown_percent(equity_curve: &[EquityCurvePoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak * 100.0);
        }
    }
    max_dd
}

/// Gross profit over gross loss.
///
/// `f64::INFINITY` when there are no losses but some profit; 0.0 when there
/// is neither.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss == 0.0 {
        return if gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    gross_profit / gross_loss
}
