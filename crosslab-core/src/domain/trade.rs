//! Trade: a simulated round trip, entry to exit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::position::PositionSide;
use super::signal::ExitReason;

/// A completed simulated trade.
///
/// The engine closes every position before returning (forced close at the
/// last bar), so exit fields are always populated. The running fields are
/// filled by a second sequential pass over the finished trade list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub position_side: PositionSide,
    /// Date of the bar whose close produced the entry signal.
    pub signal_date: NaiveDate,
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub shares: u64,
    pub is_reentry: bool,
    pub reentry_count: u32,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Outcome ──
    pub pnl: f64,
    pub pnl_percent: f64,
    pub duration_days: i64,

    // ── Running ──
    pub running_pnl: f64,
    pub running_capital: f64,
    pub drawdown_percent: f64,
}

impl Trade {
    /// Capital committed at entry.
    pub fn cost_basis(&self) -> f64 {
        self.entry_price * self.shares as f64
    }

    /// Percentage return on the cost basis.
    pub fn return_pct(&self) -> f64 {
        let basis = self.cost_basis();
        if basis == 0.0 {
            return 0.0;
        }
        self.pnl / basis * 100.0
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
