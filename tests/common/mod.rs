#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

use fusion_trading_bot::analysis::{
    AnalystView, ExternalAnalyst, FeatureVector, MarketContext, ModelPrediction, ModelPredictor,
};
use fusion_trading_bot::exchange::CollaboratorError;
use fusion_trading_bot::models::{Bar, SignalStrength};
use fusion_trading_bot::strategies::decision_engine::Clock;

/// n bars swinging around `base`, 15 minutes apart from Monday 2024-01-15.
pub fn make_oscillating_bars(n: usize, base: f64, amplitude: f64) -> Vec<Bar> {
    let start = DateTime::parse_from_rfc3339("2024-01-15T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc);

    let mut prev_close = base;
    (0..n)
        .map(|i| {
            let t = i as f64;
            let close = base + amplitude * (t * 0.37).sin() + amplitude * 0.3 * (t * 0.11).cos();
            let open = prev_close;
            prev_close = close;
            let pad = amplitude * 0.2;
            Bar {
                timestamp: start + Duration::minutes(15 * i as i64),
                open,
                high: open.max(close) + pad,
                low: open.min(close) - pad,
                close,
                volume: 100.0 + (i % 7) as f64 * 10.0,
            }
        })
        .collect()
}

pub fn monday_noon() -> Clock {
    Arc::new(|| Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap())
}

pub fn saturday_noon() -> Clock {
    Arc::new(|| Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap())
}

pub fn sunday_evening() -> Clock {
    Arc::new(|| Utc.with_ymd_and_hms(2024, 1, 21, 22, 30, 0).unwrap())
}

/// Model that always predicts the same value.
pub struct FixedModel {
    pub value: f64,
    pub confidence: f64,
}

#[async_trait]
impl ModelPredictor for FixedModel {
    async fn predict(
        &self,
        _symbol: &str,
        _features: &FeatureVector,
    ) -> Result<ModelPrediction, CollaboratorError> {
        Ok(ModelPrediction {
            value: self.value,
            confidence: self.confidence,
        })
    }
}

/// Analyst that always returns the same verdict.
pub struct FixedAnalyst {
    pub strength: SignalStrength,
    pub confidence: f64,
}

#[async_trait]
impl ExternalAnalyst for FixedAnalyst {
    async fn analyze(
        &self,
        _symbol: &str,
        _context: &MarketContext,
    ) -> Result<AnalystView, CollaboratorError> {
        Ok(AnalystView {
            strength: self.strength,
            confidence: self.confidence,
            reasoning: format!("fixed {}", self.strength),
            source: "fixed".to_string(),
        })
    }
}

/// Analyst whose backend is down.
pub struct DownAnalyst;

#[async_trait]
impl ExternalAnalyst for DownAnalyst {
    async fn analyze(
        &self,
        _symbol: &str,
        _context: &MarketContext,
    ) -> Result<AnalystView, CollaboratorError> {
        Err(CollaboratorError::Unavailable("connection refused".to_string()))
    }
}

/// Analyst that never answers.
pub struct HangingAnalyst;

#[async_trait]
impl ExternalAnalyst for HangingAnalyst {
    async fn analyze(
        &self,
        _symbol: &str,
        _context: &MarketContext,
    ) -> Result<AnalystView, CollaboratorError> {
        std::future::pending::<()>().await;
        Err(CollaboratorError::Unavailable("unreachable".to_string()))
    }
}
