use crate::models::{SignalStrength, TradeDirection, TradeParams};

const STOP_ATR_MULTIPLE: f64 = 2.0;
const TARGET_ATR_MULTIPLE: f64 = 3.0;
/// ATR stand-in as a fraction of price when no usable ATR exists.
const ATR_FALLBACK_PCT: f64 = 0.01;

pub struct TradeParameterizer;

impl TradeParameterizer {
    /// Entry at the current price with ATR-scaled stop and target.
    /// `None` for a neutral signal.
    pub fn parameterize(
        strength: SignalStrength,
        current_price: f64,
        atr: Option<f64>,
    ) -> Option<TradeParams> {
        let direction = strength.direction()?;

        let (atr, atr_fallback) = match atr {
            Some(a) if a.is_finite() && a > 0.0 => (a, false),
            _ => (current_price * ATR_FALLBACK_PCT, true),
        };

        let entry = current_price;
        let (stop_loss, take_profit) = match direction {
            TradeDirection::Buy => (
                entry - STOP_ATR_MULTIPLE * atr,
                entry + TARGET_ATR_MULTIPLE * atr,
            ),
            TradeDirection::Sell => (
                entry + STOP_ATR_MULTIPLE * atr,
                entry - TARGET_ATR_MULTIPLE * atr,
            ),
        };

        Some(TradeParams {
            entry,
            stop_loss,
            take_profit,
            risk_reward: TARGET_ATR_MULTIPLE / STOP_ATR_MULTIPLE,
            atr,
            atr_fallback,
        })
    }
}
