use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::position::PositionSide;

/// Warning that price has stretched unusually far from the fast MA while a
/// position is open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanReversionAlert {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub price: f64,
    pub fast_ma: f64,
    /// Distance from the fast MA in the trade's favour, in percent.
    pub distance_percent: f64,
    pub threshold_percent: f64,
    pub position_side: PositionSide,
    pub message: String,
}
