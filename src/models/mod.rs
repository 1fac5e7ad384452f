pub mod account;
pub mod bar;
pub mod direction;
pub mod signal;
pub mod timeframe;

pub use account::{AccountSnapshot, OpenPosition};
pub use bar::{Bar, BarSeries};
pub use direction::*;
pub use signal::{DirectionalSignal, FusedDecision, TradeIntent, TradeParams};
pub use timeframe::Timeframe;
