//! Mean-reversion alerts raised while a trade is open.

use crate::domain::{Bar, MeanReversionAlert, PositionSide, Trade};

/// Fraction of the peak distance the stretch must fall back under to re-arm.
const REARM_FRACTION: f64 = 0.5;

/// Watches the distance between close and fast MA inside each trade.
///
/// One alert per excursion: after firing, the detector tracks the running
/// peak distance and stays silent until the distance drops below half of it.
#[derive(Debug, Clone)]
pub struct MeanReversionAlertDetector {
    threshold_percent: f64,
}

#[derive(Debug, Clone, Copy)]
struct Excursion {
    armed: bool,
    peak: f64,
}

impl Excursion {
    fn reset() -> Self {
        Self {
            armed: true,
            peak: 0.0,
        }
    }
}

impl MeanReversionAlertDetector {
    pub fn new(threshold_percent: f64) -> Self {
        Self { threshold_percent }
    }

    /// Alerts for every trade, in bar order.
    pub fn detect(&self, bars: &[Bar], fast_ma: &[f64], trades: &[Trade]) -> Vec<MeanReversionAlert> {
        trades
            .iter()
            .flat_map(|trade| self.detect_in_trade(bars, fast_ma, trade))
            .collect()
    }

    fn detect_in_trade(&self, bars: &[Bar], fast_ma: &[f64], trade: &Trade) -> Vec<MeanReversionAlert> {
        let side = trade.position_side;
        let s = side.sign();
        let mut state = Excursion::reset();
        let mut alerts = Vec::new();

        let end = trade.exit_index.min(bars.len().saturating_sub(1));
        for i in trade.entry_index..=end {
            let (Some(bar), Some(&fast)) = (bars.get(i), fast_ma.get(i)) else {
                break;
            };
            if !fast.is_finite() || fast == 0.0 {
                continue;
            }
            let distance = s * (bar.close - fast) / fast * 100.0;

            if state.armed {
                if distance > self.threshold_percent {
                    state.armed = false;
                    state.peak = distance;
                    alerts.push(self.alert(i, bar, fast, distance, side));
                }
                continue;
            }

            if distance > state.peak {
                state.peak = distance;
            } else if distance < state.peak * REARM_FRACTION {
                state = Excursion::reset();
            }
        }

        alerts
    }

    fn alert(
        &self,
        index: usize,
        bar: &Bar,
        fast: f64,
        distance: f64,
        side: PositionSide,
    ) -> MeanReversionAlert {
        let direction = match side {
            PositionSide::Long => "above",
            PositionSide::Short => "below",
        };
        MeanReversionAlert {
            bar_index: index,
            date: bar.date,
            price: bar.close,
            fast_ma: fast,
            distance_percent: distance,
            threshold_percent: self.threshold_percent,
            position_side: side,
            message: format!(
                "Price {:.2} is {distance:.1}% {direction} fast MA {fast:.2}; {side} position may be overextended",
                bar.close
            ),
        }
    }
}
