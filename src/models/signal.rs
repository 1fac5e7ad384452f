use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{SignalSource, SignalStrength, TradeDirection};

/// One source's view of the market. `confidence` is self-reported certainty,
/// not a calibrated probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalSignal {
    pub source: SignalSource,
    pub strength: SignalStrength,
    pub confidence: f64,
    pub rationale: String,
}

impl DirectionalSignal {
    pub fn new(
        source: SignalSource,
        strength: SignalStrength,
        confidence: f64,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            source,
            strength,
            confidence: clamp_unit(confidence),
            rationale: rationale.into(),
        }
    }

    pub fn neutral(source: SignalSource, confidence: f64, rationale: impl Into<String>) -> Self {
        Self::new(source, SignalStrength::Neutral, confidence, rationale)
    }

    /// numeric(strength) * confidence
    pub fn weighted_score(&self) -> f64 {
        self.strength.numeric() * self.confidence
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeParams {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward: f64,
    pub atr: f64,
    /// ATR was unavailable and a percentage-of-price stand-in was used.
    pub atr_fallback: bool,
}

/// Output of one fusion pass for one symbol. Trade levels are attached
/// afterwards by value (`with_trade_params`), never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedDecision {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub strength: SignalStrength,
    pub score: f64,
    pub confidence: f64,
    pub should_trade: bool,
    pub entry: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub risk_reward: Option<f64>,
    #[serde(default)]
    pub low_confidence_context: bool,
    pub rationale: String,
    pub component_signals: Vec<DirectionalSignal>,
    pub policy: String,
}

impl FusedDecision {
    pub fn with_trade_params(self, params: Option<&TradeParams>) -> Self {
        match params {
            Some(p) => Self {
                entry: Some(p.entry),
                stop_loss: Some(p.stop_loss),
                take_profit: Some(p.take_profit),
                risk_reward: Some(p.risk_reward),
                low_confidence_context: self.low_confidence_context || p.atr_fallback,
                ..self
            },
            None => Self {
                entry: None,
                stop_loss: None,
                take_profit: None,
                risk_reward: None,
                ..self
            },
        }
    }

    pub fn direction(&self) -> Option<TradeDirection> {
        self.strength.direction()
    }

    pub fn component(&self, source: SignalSource) -> Option<&DirectionalSignal> {
        self.component_signals.iter().find(|s| s.source == source)
    }
}

/// An order request handed to the execution gateway. Not a fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub symbol: String,
    pub direction: TradeDirection,
    pub volume: f64,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision() -> FusedDecision {
        FusedDecision {
            symbol: "XAUUSD".to_string(),
            timestamp: Utc::now(),
            strength: SignalStrength::Buy,
            score: 0.9,
            confidence: 0.7,
            should_trade: true,
            entry: None,
            stop_loss: None,
            take_profit: None,
            risk_reward: None,
            low_confidence_context: false,
            rationale: String::new(),
            component_signals: vec![DirectionalSignal::new(
                SignalSource::Model,
                SignalStrength::Buy,
                0.6,
                "m",
            )],
            policy: "confidence_weighted".to_string(),
        }
    }

    #[test]
    fn confidence_is_clamped_on_construction() {
        let s = DirectionalSignal::new(SignalSource::Model, SignalStrength::Buy, 1.4, "");
        assert!((s.confidence - 1.0).abs() < 1e-9);
        let s = DirectionalSignal::new(SignalSource::Model, SignalStrength::Buy, f64::NAN, "");
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn trade_params_attach_and_flag_fallback() {
        let params = TradeParams {
            entry: 100.0,
            stop_loss: 98.0,
            take_profit: 103.0,
            risk_reward: 1.5,
            atr: 1.0,
            atr_fallback: true,
        };
        let d = decision().with_trade_params(Some(&params));
        assert_eq!(d.entry, Some(100.0));
        assert_eq!(d.take_profit, Some(103.0));
        assert!(d.low_confidence_context);
        assert!(d.component(SignalSource::Model).is_some());
        assert!(d.component(SignalSource::Technical).is_none());
    }
}
