//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), defined from bar 1.
//! ATR is the EMA of the true range series, shifted by one index so it lines
//! up with `bars`. Lookback: period.

use crate::domain::Bar;

use super::ema::ema_of_series;
use super::Indicator;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            name: format!("atr_{period}"),
        }
    }
}

/// True range for bars 1..n. `result[i]` belongs to `bars[i + 1]`.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| {
            let (prev, bar) = (&w[0], &w[1]);
            let pc = prev.close;
            (bar.high - bar.low)
                .max((bar.high - pc).abs())
                .max((bar.low - pc).abs())
        })
        .collect()
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = vec![f64::NAN; bars.len()];
        let smoothed = ema_of_series(&true_range(bars), self.period);
        for (i, v) in smoothed.into_iter().enumerate() {
            result[i + 1] = v;
        }
        result
    }
}
