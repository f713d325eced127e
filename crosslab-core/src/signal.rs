//! Directional crossover state machine.
//!
//! One automaton per side, parameterized by `PositionSide::sign()`: every
//! inequality is evaluated as `s*a > s*b` and every stop offset as
//! `price - s*atr*multiplier`. The short side is therefore the exact mirror of
//! the long side with no duplicated logic.
//!
//! States are `Flat` and `InPosition`. Entries:
//! - primary: close crosses the slow MA in the trade direction
//! - re-entry: after an exit, close crosses the fast MA while fast is still
//!   beyond slow (trend confirmed)
//!
//! Exits, first match wins: fast-MA cross, trailing stop, slow-MA trend break.
//! The trailing stop anchors on the most favourable close since entry and only
//! ever tightens.

use crate::config::{EngineConfig, StrategyMode};
use crate::domain::signal::confidence;
use crate::domain::{Bar, ExitReason, PositionSide, Signal, SignalKind};
use crate::indicators::IndicatorSet;

/// Confidence cap for primary entries and major trend breaks.
const PRIMARY_CAP: f64 = 0.9;
/// Confidence cap for re-entries and fast-MA exits.
const REENTRY_CAP: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Flat,
    InPosition,
}

/// Mutable scan state. Lives on the stack of a single `generate` call.
#[derive(Debug)]
struct ScanState {
    phase: Phase,
    has_exited: bool,
    reentry_count: u32,
    trailing_stop: f64,
    /// Highest close since entry for longs, lowest for shorts.
    extreme: f64,
}

impl ScanState {
    fn new() -> Self {
        Self {
            phase: Phase::Flat,
            has_exited: false,
            reentry_count: 0,
            trailing_stop: f64::NAN,
            extreme: f64::NAN,
        }
    }

    fn enter(&mut self, close: f64, stop: f64) {
        self.phase = Phase::InPosition;
        self.extreme = close;
        self.trailing_stop = stop;
    }

    fn exit(&mut self) {
        self.phase = Phase::Flat;
        self.has_exited = true;
    }
}

/// Per-bar inputs shared by every transition check.
struct BarView<'a> {
    index: usize,
    bar: &'a Bar,
    prev_close: f64,
    fast: f64,
    slow: f64,
    atr: f64,
    prev_fast: f64,
    prev_slow: f64,
}

/// Crossover automaton for one side.
#[derive(Debug, Clone)]
pub struct DirectionalGenerator {
    side: PositionSide,
    atr_multiplier: f64,
    scan_start: usize,
}

impl DirectionalGenerator {
    pub fn new(side: PositionSide, config: &EngineConfig) -> Self {
        let atr_multiplier = match side {
            PositionSide::Long => config.atr_multiplier_long,
            PositionSide::Short => config.atr_multiplier_short,
        };
        Self {
            side,
            atr_multiplier,
            scan_start: config.scan_start(),
        }
    }

    /// Scan the series and return this side's signals in chronological order.
    pub fn generate(&self, bars: &[Bar], indicators: &IndicatorSet) -> Vec<Signal> {
        let s = self.side.sign();
        let mut state = ScanState::new();
        let mut signals = Vec::new();

        for i in self.scan_start.max(1)..bars.len() {
            let Some((fast, slow, atr)) = indicators.at(i) else {
                continue;
            };
            let Some((prev_fast, prev_slow)) = indicators.ma_at(i - 1) else {
                continue;
            };
            let bar = &bars[i];
            let prev_close = bars[i - 1].close;
            if bar.close.is_nan() || prev_close.is_nan() {
                continue;
            }

            let view = BarView {
                index: i,
                bar,
                prev_close,
                fast,
                slow,
                atr,
                prev_fast,
                prev_slow,
            };

            let signal = match state.phase {
                Phase::Flat => self.check_entry(&view, &mut state, s),
                Phase::InPosition => self.check_exit(&view, &mut state, s),
            };
            signals.extend(signal);
        }

        signals
    }

    fn check_entry(&self, v: &BarView<'_>, state: &mut ScanState, s: f64) -> Option<Signal> {
        let close = v.bar.close;
        let stop = close - s * v.atr * self.atr_multiplier;
        let beyond = self.beyond();

        if s * close > s * v.slow && s * v.prev_close <= s * v.prev_slow {
            state.reentry_count = 0;
            state.enter(close, stop);
            let reasoning = format!(
                "Close {close:.2} crossed {beyond} slow MA {:.2}; entering {} with ATR stop at {stop:.2}",
                v.slow, self.side
            );
            return Some(self.signal(
                v,
                SignalKind::entry(self.side),
                reasoning,
                confidence(close, v.slow, PRIMARY_CAP),
                state,
                false,
                None,
            ));
        }

        if state.has_exited
            && s * close > s * v.fast
            && s * v.fast > s * v.slow
            && s * v.prev_close <= s * v.prev_fast
        {
            state.reentry_count += 1;
            state.enter(close, stop);
            let reasoning = format!(
                "Re-entry #{}: close {close:.2} crossed {beyond} fast MA {:.2} with fast MA still {beyond} slow MA {:.2}",
                state.reentry_count, v.fast, v.slow
            );
            return Some(self.signal(
                v,
                SignalKind::entry(self.side),
                reasoning,
                confidence(close, v.fast, REENTRY_CAP),
                state,
                true,
                None,
            ));
        }

        None
    }

    fn check_exit(&self, v: &BarView<'_>, state: &mut ScanState, s: f64) -> Option<Signal> {
        let close = v.bar.close;

        if s * close > s * state.extreme {
            state.extreme = close;
            let candidate = close - s * v.atr * self.atr_multiplier;
            if s * candidate > s * state.trailing_stop {
                state.trailing_stop = candidate;
            }
        }

        let against = self.against();
        let stop = state.trailing_stop;
        let (reason, reasoning, conf) =
            if s * close < s * v.fast && s * v.prev_close >= s * v.prev_fast {
                (
                    ExitReason::FastMaCross,
                    format!("Close {close:.2} crossed {against} fast MA {:.2}", v.fast),
                    confidence(close, v.fast, REENTRY_CAP),
                )
            } else if s * close < s * stop {
                (
                    ExitReason::TrailingStop,
                    format!("Close {close:.2} breached trailing stop {stop:.2}"),
                    confidence(close, stop, PRIMARY_CAP),
                )
            } else if s * close < s * v.slow {
                (
                    ExitReason::TrendBreak,
                    format!(
                        "Major trend break: close {close:.2} {against} slow MA {:.2}",
                        v.slow
                    ),
                    confidence(close, v.slow, PRIMARY_CAP),
                )
            } else {
                return None;
            };

        state.exit();
        Some(self.signal(
            v,
            SignalKind::exit(self.side),
            reasoning,
            conf,
            state,
            false,
            Some(reason),
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn signal(
        &self,
        v: &BarView<'_>,
        kind: SignalKind,
        reasoning: String,
        confidence: f64,
        state: &ScanState,
        is_reentry: bool,
        exit_reason: Option<ExitReason>,
    ) -> Signal {
        Signal {
            bar_index: v.index,
            date: v.bar.date,
            kind,
            price: v.bar.close,
            fast_ma: v.fast,
            slow_ma: v.slow,
            reasoning,
            confidence,
            atr: v.atr,
            trailing_stop: state.trailing_stop,
            position_side: self.side,
            is_reentry,
            reentry_count: state.reentry_count,
            exit_reason,
        }
    }

    fn beyond(&self) -> &'static str {
        match self.side {
            PositionSide::Long => "above",
            PositionSide::Short => "below",
        }
    }

    fn against(&self) -> &'static str {
        match self.side {
            PositionSide::Long => "below",
            PositionSide::Short => "above",
        }
    }
}

/// Run the automata selected by `config.strategy_mode`.
///
/// In `Both` mode the two sides run independently and are merged by bar,
/// exits ahead of entries on the same bar.
pub fn generate_signals(bars: &[Bar], indicators: &IndicatorSet, config: &EngineConfig) -> Vec<Signal> {
    let sides: &[PositionSide] = match config.strategy_mode {
        StrategyMode::Long => &[PositionSide::Long],
        StrategyMode::Short => &[PositionSide::Short],
        StrategyMode::Both => &[PositionSide::Long, PositionSide::Short],
    };

    let mut signals: Vec<Signal> = sides
        .iter()
        .flat_map(|&side| DirectionalGenerator::new(side, config).generate(bars, indicators))
        .collect();
    signals.sort_by_key(|s| (s.bar_index, s.is_entry()));
    signals
}
