pub mod fusion;
pub mod indicators;
pub mod levels;
pub mod risk;
pub mod trade_params;
pub mod trading_hours;
