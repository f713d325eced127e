//! Signal: one state transition of the crossover state machine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::PositionSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    EntryLong,
    ExitLong,
    EntryShort,
    ExitShort,
}

impl SignalKind {
    pub fn entry(side: PositionSide) -> Self {
        match side {
            PositionSide::Long => SignalKind::EntryLong,
            PositionSide::Short => SignalKind::EntryShort,
        }
    }

    pub fn exit(side: PositionSide) -> Self {
        match side {
            PositionSide::Long => SignalKind::ExitLong,
            PositionSide::Short => SignalKind::ExitShort,
        }
    }

    pub fn is_entry(self) -> bool {
        matches!(self, SignalKind::EntryLong | SignalKind::EntryShort)
    }

    pub fn side(self) -> PositionSide {
        match self {
            SignalKind::EntryLong | SignalKind::ExitLong => PositionSide::Long,
            SignalKind::EntryShort | SignalKind::ExitShort => PositionSide::Short,
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Close crossed back through the fast MA against the trade.
    FastMaCross,
    /// Close breached the ATR trailing stop.
    TrailingStop,
    /// Close crossed the slow MA: the trend itself is gone.
    TrendBreak,
    /// Series ended with the position still open.
    EndOfPeriod,
}

impl ExitReason {
    pub fn label(self) -> &'static str {
        match self {
            ExitReason::FastMaCross => "fast MA cross",
            ExitReason::TrailingStop => "trailing stop",
            ExitReason::TrendBreak => "major trend break",
            ExitReason::EndOfPeriod => "end of period",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A trading signal observed at a bar's close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub kind: SignalKind,
    /// Close of the signal bar.
    pub price: f64,
    pub fast_ma: f64,
    pub slow_ma: f64,
    pub reasoning: String,
    /// Bounded strength proxy in [0, 1]; not a probability.
    pub confidence: f64,
    pub atr: f64,
    pub trailing_stop: f64,
    pub position_side: PositionSide,
    pub is_reentry: bool,
    /// Re-entries taken since the last primary entry on this side.
    pub reentry_count: u32,
    /// Set on exit signals only.
    pub exit_reason: Option<ExitReason>,
}

impl Signal {
    pub fn is_entry(&self) -> bool {
        self.kind.is_entry()
    }
}

/// Bounded confidence heuristic: distance from the reference MA, scaled and capped.
pub fn confidence(close: f64, reference: f64, cap: f64) -> f64 {
    if reference == 0.0 || !reference.is_finite() {
        return 0.0;
    }
    ((close - reference).abs() / reference * 10.0).min(cap)
}
