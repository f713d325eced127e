//! Domain types for CrossLab

pub mod alert;
pub mod bar;
pub mod position;
pub mod signal;
pub mod trade;

pub use alert::MeanReversionAlert;
pub use bar::Bar;
pub use position::PositionSide;
pub use signal::{ExitReason, Signal, SignalKind};
pub use trade::Trade;
