use crate::analysis::{AnalystView, MarketContext, ModelPrediction, TechnicalAnalyst};
use crate::exchange::CollaboratorError;
use crate::models::{DirectionalSignal, SignalSource};

pub const NOT_TRAINED_CONFIDENCE: f64 = 0.5;
pub const MODEL_FAILURE_CONFIDENCE: f64 = 0.3;
/// Cap on the technical-only stand-in for the external analyst.
pub const EXTERNAL_FALLBACK_CAP: f64 = 0.5;

/// Model result, or a neutral stand-in when the model could not answer.
pub fn model_signal(result: Result<ModelPrediction, CollaboratorError>) -> DirectionalSignal {
    match result {
        Ok(p) if p.value.is_finite() => DirectionalSignal::new(
            SignalSource::Model,
            p.strength(),
            p.confidence,
            format!("model output {:.2}", p.value),
        ),
        Ok(p) => DirectionalSignal::neutral(
            SignalSource::Model,
            MODEL_FAILURE_CONFIDENCE,
            format!("model returned non-finite output {}", p.value),
        ),
        Err(CollaboratorError::NotTrained(s)) => DirectionalSignal::neutral(
            SignalSource::Model,
            NOT_TRAINED_CONFIDENCE,
            format!("model not trained for {}", s),
        ),
        Err(e) => DirectionalSignal::neutral(
            SignalSource::Model,
            MODEL_FAILURE_CONFIDENCE,
            format!("model unavailable: {}", e),
        ),
    }
}

/// Analyst verdict, or the deterministic technical verdict at reduced
/// confidence when the analyst could not answer.
pub fn external_signal(
    result: Result<AnalystView, CollaboratorError>,
    context: &MarketContext,
) -> DirectionalSignal {
    match result {
        Ok(view) => DirectionalSignal::new(
            SignalSource::ExternalAnalysis,
            view.strength,
            view.confidence,
            view.reasoning,
        ),
        Err(e) => {
            let stand_in = TechnicalAnalyst::evaluate(context);
            DirectionalSignal::new(
                SignalSource::ExternalAnalysis,
                stand_in.strength,
                stand_in.confidence.min(EXTERNAL_FALLBACK_CAP),
                format!("analyst unavailable ({}); {}", e, stand_in.reasoning),
            )
        }
    }
}
