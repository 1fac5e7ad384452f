use async_trait::async_trait;

use crate::analysis::{AnalystView, ExternalAnalyst, MarketContext};
use crate::exchange::CollaboratorError;
use crate::models::SignalStrength;

/// Deterministic multi-factor analyst. Also the stand-in verdict when the
/// real external analyst cannot be reached.
#[derive(Debug, Default, Clone)]
pub struct TechnicalAnalyst;

impl TechnicalAnalyst {
    pub fn evaluate(context: &MarketContext) -> AnalystView {
        let mut score = 0i32;
        let mut factors: Vec<&str> = Vec::new();

        let rsi = context.rsi;
        if rsi < 30.0 {
            score += 2;
            factors.push("RSI oversold");
        } else if rsi < 40.0 {
            score += 1;
            factors.push("RSI approaching oversold");
        } else if rsi > 70.0 {
            score -= 2;
            factors.push("RSI overbought");
        } else if rsi > 60.0 {
            score -= 1;
            factors.push("RSI approaching overbought");
        }

        if context.macd > 0.0 {
            score += 1;
            factors.push("MACD bullish");
        } else {
            score -= 1;
            factors.push("MACD bearish");
        }

        if context.price_change_pct > 1.0 {
            score += 1;
            factors.push("Strong upward momentum");
        } else if context.price_change_pct < -1.0 {
            score -= 1;
            factors.push("Strong downward momentum");
        }

        if context.volume_change_pct.abs() > 50.0 {
            factors.push("High volume confirmation");
        }

        let (strength, confidence) = match score {
            s if s >= 3 => (SignalStrength::StrongBuy, 0.85),
            s if s >= 1 => (SignalStrength::Buy, 0.75),
            s if s <= -3 => (SignalStrength::StrongSell, 0.85),
            s if s <= -1 => (SignalStrength::Sell, 0.75),
            _ => (SignalStrength::Neutral, 0.60),
        };

        AnalystView {
            strength,
            confidence,
            reasoning: format!("Technical Analysis: {}", factors[..factors.len().min(3)].join(", ")),
            source: "technical".to_string(),
        }
    }
}

#[async_trait]
impl ExternalAnalyst for TechnicalAnalyst {
    async fn analyze(
        &self,
        _symbol: &str,
        context: &MarketContext,
    ) -> Result<AnalystView, CollaboratorError> {
        Ok(Self::evaluate(context))
    }
}
