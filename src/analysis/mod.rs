pub mod llm;
pub mod model;
pub mod technical;

pub use llm::LlmAnalyst;
pub use model::UntrainedModel;
pub use technical::TechnicalAnalyst;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::indicators::TechnicalView;
use crate::exchange::CollaboratorError;
use crate::models::{BarSeries, SignalStrength, Timeframe, Trend};

/// Numeric model inputs, one named value per indicator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn from_view(view: &TechnicalView) -> Self {
        let mut names = Vec::new();
        let mut values = Vec::new();
        for (name, value) in view.snapshot.to_map() {
            names.push(name.to_string());
            values.push(value);
        }
        if let Some(change) = view.price_change_pct {
            names.push("price_change_pct".to_string());
            values.push(change);
        }
        Self { names, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }
}

/// Raw model output: `value` on the -2..=2 strength scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    pub value: f64,
    pub confidence: f64,
}

impl ModelPrediction {
    pub fn strength(&self) -> SignalStrength {
        SignalStrength::from_model_output(self.value)
    }
}

/// Qualitative analyst's verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystView {
    pub strength: SignalStrength,
    pub confidence: f64,
    pub reasoning: String,
    pub source: String,
}

/// What a qualitative analyst gets to see about one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketContext {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub current_price: f64,
    pub price_change_pct: f64,
    pub volume_change_pct: f64,
    pub rsi: f64,
    pub macd: f64,
    pub bb_position: f64,
    pub recent_high: f64,
    pub recent_low: f64,
    pub volatility: f64,
    pub short_term_up: bool,
    pub trend: Trend,
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
    pub indicators: BTreeMap<String, f64>,
}

impl MarketContext {
    pub fn build(symbol: &str, timeframe: Timeframe, bars: &BarSeries, view: &TechnicalView) -> Self {
        let snap = &view.snapshot;

        let volumes = bars.volumes();
        let volume_change_pct = match volumes.split_last() {
            Some((last, rest)) if !rest.is_empty() => {
                let prev = &rest[rest.len().saturating_sub(5)..];
                let avg = prev.iter().sum::<f64>() / prev.len() as f64;
                if avg > 0.0 {
                    (last - avg) / avg * 100.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };

        let day = bars.tail(24);
        let closes20 = bars.tail(20).closes();
        let volatility = if closes20.len() >= 2 {
            let mean = closes20.iter().sum::<f64>() / closes20.len() as f64;
            let var = closes20.iter().map(|c| (c - mean).powi(2)).sum::<f64>()
                / (closes20.len() - 1) as f64;
            var.sqrt()
        } else {
            0.0
        };
        let last5 = bars.tail(5).closes();
        let short_term_up = match (last5.first(), last5.last()) {
            (Some(first), Some(last)) => last > first,
            _ => false,
        };

        Self {
            symbol: symbol.to_string(),
            timeframe,
            current_price: view.current_price,
            price_change_pct: view.price_change_pct.unwrap_or(0.0),
            volume_change_pct,
            rsi: snap.rsi_14.unwrap_or(50.0),
            macd: snap.macd.unwrap_or(0.0),
            bb_position: snap.bb_position.unwrap_or(0.5),
            recent_high: day.highs_max(),
            recent_low: day.lows_min(),
            volatility,
            short_term_up,
            trend: view.trend,
            support: view.support.clone(),
            resistance: view.resistance.clone(),
            indicators: snap
                .to_map()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

#[async_trait]
pub trait ModelPredictor: Send + Sync {
    async fn predict(
        &self,
        symbol: &str,
        features: &FeatureVector,
    ) -> Result<ModelPrediction, CollaboratorError>;
}

#[async_trait]
pub trait ExternalAnalyst: Send + Sync {
    async fn analyze(
        &self,
        symbol: &str,
        context: &MarketContext,
    ) -> Result<AnalystView, CollaboratorError>;
}
