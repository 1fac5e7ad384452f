use async_trait::async_trait;

use crate::analysis::{FeatureVector, ModelPrediction, ModelPredictor};
use crate::exchange::CollaboratorError;

/// Stand-in predictor for deployments without a trained model.
#[derive(Debug, Default, Clone)]
pub struct UntrainedModel;

#[async_trait]
impl ModelPredictor for UntrainedModel {
    async fn predict(
        &self,
        symbol: &str,
        _features: &FeatureVector,
    ) -> Result<ModelPrediction, CollaboratorError> {
        Err(CollaboratorError::NotTrained(symbol.to_string()))
    }
}
