//! Trade executor: turns a chronological signal stream into simulated trades.
//!
//! Signals act on the bar after the signal bar, at that bar's open. Sizing is
//! integer shares against the capital available at entry; re-entries take half
//! the usual allocation. Any position still open after the last bar is closed
//! at the last close with `ExitReason::EndOfPeriod`.

use chrono::NaiveDate;
use tracing::debug;

use crate::config::EngineConfig;
use crate::domain::{Bar, ExitReason, PositionSide, Signal, Trade};

/// Position opened but not yet closed.
#[derive(Debug, Clone)]
struct OpenPosition {
    side: PositionSide,
    signal_date: NaiveDate,
    entry_index: usize,
    entry_date: NaiveDate,
    entry_price: f64,
    shares: u64,
    is_reentry: bool,
    reentry_count: u32,
}

/// Cash bookkeeping for a single run.
///
/// Long entries consume `shares * price`; short entries add the sale proceeds
/// and the cover pays them back.
#[derive(Debug, Clone)]
struct CashLedger {
    available: f64,
}

impl CashLedger {
    fn open(&mut self, side: PositionSide, shares: u64, price: f64) {
        self.available -= side.sign() * shares as f64 * price;
    }

    fn close(&mut self, side: PositionSide, shares: u64, price: f64) {
        self.available += side.sign() * shares as f64 * price;
    }
}

#[derive(Debug, Clone)]
pub struct TradeExecutor {
    initial_capital: f64,
    sizing_percent_long: f64,
    sizing_percent_short: f64,
}

impl TradeExecutor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            initial_capital: config.initial_capital,
            sizing_percent_long: config.sizing_percent_long,
            sizing_percent_short: config.sizing_percent_short,
        }
    }

    /// Integer share count for an entry at `price` with `available` capital.
    pub fn shares_for(&self, side: PositionSide, available: f64, price: f64, is_reentry: bool) -> u64 {
        if !price.is_finite() || price <= 0.0 || available.is_nan() || available <= 0.0 {
            return 0;
        }
        let percent = match side {
            PositionSide::Long => self.sizing_percent_long,
            PositionSide::Short => self.sizing_percent_short,
        };
        let mut at_risk = available * percent / 100.0;
        if is_reentry {
            at_risk *= 0.5;
        }
        (at_risk / price).floor() as u64
    }

    /// Simulate `signals` (chronological) over `bars`.
    ///
    /// Returned trades are closed, non-overlapping, and carry running totals.
    pub fn execute(&self, bars: &[Bar], signals: &[Signal]) -> Vec<Trade> {
        let mut trades = Vec::new();
        let Some(last) = bars.len().checked_sub(1) else {
            return trades;
        };

        let mut ledger = CashLedger {
            available: self.initial_capital,
        };
        let mut open: Option<OpenPosition> = None;

        for signal in signals {
            let exec_index = signal.bar_index + 1;
            if exec_index > last {
                // Entry on the final bar has nowhere to fill; an exit is
                // covered by the end-of-period close below.
                continue;
            }
            let exec_bar = &bars[exec_index];
            let side = signal.kind.side();

            if signal.is_entry() {
                if open.is_some() {
                    continue;
                }
                let price = exec_bar.open;
                let shares = self.shares_for(side, ledger.available, price, signal.is_reentry);
                if shares == 0 {
                    debug!(
                        bar = signal.bar_index,
                        price, "entry dropped: allocation below one share"
                    );
                    continue;
                }
                ledger.open(side, shares, price);
                open = Some(OpenPosition {
                    side,
                    signal_date: signal.date,
                    entry_index: exec_index,
                    entry_date: exec_bar.date,
                    entry_price: price,
                    shares,
                    is_reentry: signal.is_reentry,
                    reentry_count: signal.reentry_count,
                });
            } else {
                let Some(position) = open.as_ref() else {
                    continue;
                };
                if position.side != side {
                    continue;
                }
                let reason = signal.exit_reason.unwrap_or(ExitReason::FastMaCross);
                if let Some(position) = open.take() {
                    ledger.close(position.side, position.shares, exec_bar.open);
                    trades.push(close_trade(position, exec_index, exec_bar, exec_bar.open, reason));
                }
            }
        }

        if let Some(position) = open.take() {
            let bar = &bars[last];
            ledger.close(position.side, position.shares, bar.close);
            trades.push(close_trade(position, last, bar, bar.close, ExitReason::EndOfPeriod));
        }

        annotate_running(&mut trades, self.initial_capital);
        debug!(
            trades = trades.len(),
            cash = ledger.available,
            "execution complete"
        );
        trades
    }
}

fn close_trade(
    position: OpenPosition,
    exit_index: usize,
    exit_bar: &Bar,
    exit_price: f64,
    exit_reason: ExitReason,
) -> Trade {
    let shares = position.shares as f64;
    let pnl = position.side.sign() * shares * (exit_price - position.entry_price);
    let basis = position.entry_price * shares;
    let pnl_percent = if basis > 0.0 { pnl / basis * 100.0 } else { 0.0 };

    Trade {
        position_side: position.side,
        signal_date: position.signal_date,
        entry_index: position.entry_index,
        entry_date: position.entry_date,
        entry_price: position.entry_price,
        shares: position.shares,
        is_reentry: position.is_reentry,
        reentry_count: position.reentry_count,
        exit_index,
        exit_date: exit_bar.date,
        exit_price,
        exit_reason,
        pnl,
        pnl_percent,
        duration_days: (exit_bar.date - position.entry_date).num_days(),
        running_pnl: 0.0,
        running_capital: 0.0,
        drawdown_percent: 0.0,
    }
}

/// Fill `running_pnl`, `running_capital`, and `drawdown_percent` in order.
///
/// The drawdown peak starts at `initial_capital`, so `drawdown_percent` is
/// always `<= 0`.
pub fn annotate_running(trades: &mut [Trade], initial_capital: f64) {
    let mut running_pnl = 0.0;
    let mut peak = initial_capital;
    for trade in trades.iter_mut() {
        running_pnl += trade.pnl;
        let capital = initial_capital + running_pnl;
        peak = peak.max(capital);
        trade.running_pnl = running_pnl;
        trade.running_capital = capital;
        trade.drawdown_percent = if peak > 0.0 {
            (capital - peak) / peak * 100.0
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalKind;
    use crate::indicators::make_bars;

    fn signal(bar_index: usize, bars: &[Bar], kind: SignalKind) -> Signal {
        let side = kind.side();
        Signal {
            bar_index,
            date: bars[bar_index].date,
            kind,
            price: bars[bar_index].close,
            fast_ma: bars[bar_index].close,
            slow_ma: bars[bar_index].close,
            reasoning: String::new(),
            confidence: 0.5,
            atr: 1.0,
            trailing_stop: 0.0,
            position_side: side,
            is_reentry: false,
            reentry_count: 0,
            exit_reason: if kind.is_entry() {
                None
            } else {
                Some(ExitReason::FastMaCross)
            },
        }
    }

    fn reentry(mut s: Signal, count: u32) -> Signal {
        s.is_reentry = true;
        s.reentry_count = count;
        s
    }

    fn bars_linear(n: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        make_bars(&closes)
    }

    #[test]
    fn entry_fills_at_next_open() {
        let bars = bars_linear(10);
        let exec = TradeExecutor::new(&EngineConfig::default());
        let signals = vec![
            signal(2, &bars, SignalKind::EntryLong),
            signal(5, &bars, SignalKind::ExitLong),
        ];
        let trades = exec.execute(&bars, &signals);
        assert_eq!(trades.len(), 1);
        let t = &trades[0];
        assert_eq!(t.entry_index, 3);
        assert_eq!(t.entry_price, bars[3].open);
        assert_eq!(t.signal_date, bars[2].date);
        assert!(t.entry_date > t.signal_date);
        assert_eq!(t.exit_index, 6);
        assert_eq!(t.exit_price, bars[6].open);
        assert_eq!(t.exit_reason, ExitReason::FastMaCross);
        assert_eq!(t.duration_days, 3);
    }

    #[test]
    fn shares_are_floored_against_available_capital() {
        let bars = bars_linear(10);
        let exec = TradeExecutor::new(&EngineConfig::default());
        let trades = exec.execute(&bars, &[signal(2, &bars, SignalKind::EntryLong)]);
        // open of bar 3 = close of bar 2 = 102
        assert_eq!(trades[0].shares, (100_000.0_f64 * 0.05 / 102.0).floor() as u64);
    }

    #[test]
    fn reentry_is_sized_at_half() {
        let exec = TradeExecutor::new(&EngineConfig::default());
        let full = exec.shares_for(PositionSide::Long, 100_000.0, 50.0, false);
        let half = exec.shares_for(PositionSide::Long, 100_000.0, 50.0, true);
        assert_eq!(full, 100);
        assert_eq!(half, 50);
    }

    #[test]
    fn zero_share_entry_is_dropped() {
        let cfg = EngineConfig {
            initial_capital: 1_000.0,
            sizing_percent_long: 1.0,
            ..EngineConfig::default()
        };
        let bars = bars_linear(10);
        let exec = TradeExecutor::new(&cfg);
        let trades = exec.execute(
            &bars,
            &[
                signal(2, &bars, SignalKind::EntryLong),
                signal(5, &bars, SignalKind::ExitLong),
            ],
        );
        assert!(trades.is_empty());
    }

    #[test]
    fn open_position_is_closed_at_end_of_period() {
        let bars = bars_linear(10);
        let exec = TradeExecutor::new(&EngineConfig::default());
        let trades = exec.execute(&bars, &[signal(2, &bars, SignalKind::EntryLong)]);
        let t = &trades[0];
        assert_eq!(t.exit_index, 9);
        assert_eq!(t.exit_price, bars[9].close);
        assert_eq!(t.exit_reason, ExitReason::EndOfPeriod);
    }

    #[test]
    fn entry_signal_on_last_bar_is_dropped() {
        let bars = bars_linear(10);
        let exec = TradeExecutor::new(&EngineConfig::default());
        let trades = exec.execute(&bars, &[signal(9, &bars, SignalKind::EntryLong)]);
        assert!(trades.is_empty());
    }

    #[test]
    fn exit_signal_on_last_bar_defers_to_end_of_period() {
        let bars = bars_linear(10);
        let exec = TradeExecutor::new(&EngineConfig::default());
        let trades = exec.execute(
            &bars,
            &[
                signal(2, &bars, SignalKind::EntryLong),
                signal(9, &bars, SignalKind::ExitLong),
            ],
        );
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::EndOfPeriod);
        assert_eq!(trades[0].exit_price, bars[9].close);
    }

    #[test]
    fn second_entry_while_open_is_ignored() {
        let bars = bars_linear(12);
        let exec = TradeExecutor::new(&EngineConfig::default());
        let trades = exec.execute(
            &bars,
            &[
                signal(1, &bars, SignalKind::EntryLong),
                signal(3, &bars, SignalKind::EntryShort),
                signal(5, &bars, SignalKind::ExitShort),
                signal(7, &bars, SignalKind::ExitLong),
            ],
        );
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].position_side, PositionSide::Long);
        assert_eq!(trades[0].exit_index, 8);
    }

    #[test]
    fn short_pnl_is_mirrored() {
        // Falling series: short profits.
        let closes: Vec<f64> = (0..10).map(|i| 200.0 - 2.0 * i as f64).collect();
        let bars = make_bars(&closes);
        let exec = TradeExecutor::new(&EngineConfig::default());
        let trades = exec.execute(
            &bars,
            &[
                signal(1, &bars, SignalKind::EntryShort),
                signal(5, &bars, SignalKind::ExitShort),
            ],
        );
        let t = &trades[0];
        assert_eq!(t.position_side, PositionSide::Short);
        let expected = t.shares as f64 * (t.entry_price - t.exit_price);
        assert!((t.pnl - expected).abs() < 1e-9);
        assert!(t.pnl > 0.0);
    }

    #[test]
    fn running_fields_accumulate() {
        let bars = bars_linear(20);
        let exec = TradeExecutor::new(&EngineConfig::default());
        let trades = exec.execute(
            &bars,
            &[
                signal(1, &bars, SignalKind::EntryLong),
                signal(4, &bars, SignalKind::ExitLong),
                reentry(signal(6, &bars, SignalKind::EntryLong), 1),
                signal(9, &bars, SignalKind::ExitLong),
            ],
        );
        assert_eq!(trades.len(), 2);
        assert!(trades[1].is_reentry);
        assert_eq!(trades[1].reentry_count, 1);
        let total: f64 = trades.iter().map(|t| t.pnl).sum();
        let last = trades.last().unwrap();
        assert!((last.running_pnl - total).abs() < 1e-9);
        assert!((last.running_capital - (100_000.0 + total)).abs() < 1e-9);
        assert!(trades.iter().all(|t| t.drawdown_percent <= 0.0));
    }

    #[test]
    fn drawdown_percent_tracks_peak_capital() {
        let bars = bars_linear(20);
        let mut trades = TradeExecutor::new(&EngineConfig::default()).execute(
            &bars,
            &[
                signal(1, &bars, SignalKind::EntryLong),
                signal(4, &bars, SignalKind::ExitLong),
            ],
        );
        let mut losing = trades[0].clone();
        losing.pnl = -2_000.0;
        trades[0].pnl = 1_000.0;
        trades.push(losing);
        annotate_running(&mut trades, 100_000.0);
        assert_eq!(trades[0].drawdown_percent, 0.0);
        let expected = (99_000.0 - 101_000.0) / 101_000.0 * 100.0;
        assert!((trades[1].drawdown_percent - expected).abs() < 1e-9);
    }
}
