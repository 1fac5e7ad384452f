use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{DirectionalSignal, FusedDecision, SignalStrength};

const MAX_CONFIDENCE: f64 = 0.95;
const TRADE_MIN_CONFIDENCE: f64 = 0.6;
const TRADE_MIN_SCORE: f64 = 0.5;

/// How the three source signals are combined. Chosen once per engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FusionPolicy {
    /// Confidence-weighted mean of all three sources.
    #[default]
    ConfidenceWeighted,
    /// External analysis blended with the model when both are confident
    /// enough; otherwise the more confident of the two wins.
    ExternalModelBlend {
        external_min: f64,
        model_min: f64,
        external_weight: f64,
    },
}

impl FusionPolicy {
    pub fn external_model_blend() -> Self {
        FusionPolicy::ExternalModelBlend {
            external_min: 0.6,
            model_min: 0.5,
            external_weight: 0.6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FusionPolicy::ConfidenceWeighted => "confidence_weighted",
            FusionPolicy::ExternalModelBlend { .. } => "external_model_blend",
        }
    }
}

impl fmt::Display for FusionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub struct SignalFusion {
    policy: FusionPolicy,
}

impl SignalFusion {
    pub fn new(policy: FusionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &FusionPolicy {
        &self.policy
    }

    /// Combines the three source signals into a decision stamped at `now`.
    pub fn fuse(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
        technical: &DirectionalSignal,
        model: &DirectionalSignal,
        external: &DirectionalSignal,
    ) -> FusedDecision {
        let (score, confidence, strength, rationale) = match &self.policy {
            FusionPolicy::ConfidenceWeighted => {
                let (score, confidence) = confidence_weighted(&[technical, model, external]);
                let rationale = format!(
                    "Weighted score {:.2} from technical {} ({:.2}), model {} ({:.2}), external {} ({:.2})",
                    score,
                    technical.strength,
                    technical.confidence,
                    model.strength,
                    model.confidence,
                    external.strength,
                    external.confidence
                );
                (score, confidence, weighted_strength(score), rationale)
            }
            FusionPolicy::ExternalModelBlend {
                external_min,
                model_min,
                external_weight,
            } => {
                let (score, confidence, mode) = if external.confidence > *external_min
                    && model.confidence > *model_min
                {
                    let model_weight = 1.0 - external_weight;
                    (
                        external.weighted_score() * external_weight
                            + model.weighted_score() * model_weight,
                        external.confidence * external_weight + model.confidence * model_weight,
                        "blended",
                    )
                } else if external.confidence > model.confidence {
                    (external.strength.numeric(), external.confidence, "external only")
                } else {
                    (model.strength.numeric(), model.confidence, "model only")
                };
                let rationale = format!(
                    "{} score {:.2} | external: {} | technical {} ({:.2})",
                    mode, score, external.rationale, technical.strength, technical.confidence
                );
                (score, confidence, blend_strength(score), rationale)
            }
        };

        let confidence = confidence.min(MAX_CONFIDENCE);
        let should_trade = confidence > TRADE_MIN_CONFIDENCE
            && !strength.is_neutral()
            && score.abs() > TRADE_MIN_SCORE;

        FusedDecision {
            symbol: symbol.to_string(),
            timestamp: now,
            strength,
            score,
            confidence,
            should_trade,
            entry: None,
            stop_loss: None,
            take_profit: None,
            risk_reward: None,
            low_confidence_context: false,
            rationale,
            component_signals: vec![technical.clone(), model.clone(), external.clone()],
            policy: self.policy.name().to_string(),
        }
    }
}

/// Returns (Σ n·c / Σ c, Σ c / N). A zero confidence total scores 0.
fn confidence_weighted(signals: &[&DirectionalSignal]) -> (f64, f64) {
    let total: f64 = signals.iter().map(|s| s.confidence).sum();
    let weighted: f64 = signals.iter().map(|s| s.weighted_score()).sum();
    let score = if total > 0.0 { weighted / total } else { 0.0 };
    (score, total / signals.len() as f64)
}

fn weighted_strength(score: f64) -> SignalStrength {
    if score > 1.2 {
        SignalStrength::StrongBuy
    } else if score > 0.4 {
        SignalStrength::Buy
    } else if score < -1.2 {
        SignalStrength::StrongSell
    } else if score < -0.4 {
        SignalStrength::Sell
    } else {
        SignalStrength::Neutral
    }
}

fn blend_strength(score: f64) -> SignalStrength {
    SignalStrength::from_model_output(score)
}
