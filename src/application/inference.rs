//! Inference service: encode, scale, and run every registered model.
//!
//! The service owns the scaler set and the model set. Both are read-only
//! after construction, so a single instance is shared by reference for the
//! lifetime of the process.

use std::collections::HashSet;

use crate::adapters::ArtifactError;
use crate::domain::{encode, FeatureVector, ModelPrediction, PredictionReport, RawInput, ScalerSet};
use crate::ports::{ArtifactSource, Classifier, ModelEntry};
use crate::HeartcheckError;

/// A loaded classifier with its display name.
pub struct NamedModel {
    pub name: String,
    pub classifier: Box<dyn Classifier>,
}

impl std::fmt::Debug for NamedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedModel")
            .field("name", &self.name)
            .field("family", &self.classifier.family())
            .finish()
    }
}

/// Service for running every model on one request.
#[derive(Debug)]
pub struct InferenceService {
    scalers: ScalerSet,
    models: Vec<NamedModel>,
}

impl InferenceService {
    /// Create a service from already loaded parts.
    ///
    /// # Errors
    /// Returns `HeartcheckError::Validation` if there are no models or two
    /// models share a name.
    pub fn new(scalers: ScalerSet, models: Vec<NamedModel>) -> Result<Self, HeartcheckError> {
        if models.is_empty() {
            return Err(HeartcheckError::Validation("No models loaded".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = models.iter().find(|m| !seen.insert(m.name.as_str())) {
            return Err(HeartcheckError::Validation(format!(
                "Duplicate model name: {}",
                dup.name
            )));
        }

        Ok(Self { scalers, models })
    }

    /// Load the scalers and every model in `registry` from `source`.
    ///
    /// Any missing or invalid artifact aborts loading.
    ///
    /// # Errors
    /// Returns `HeartcheckError::Artifact` for the first artifact that fails.
    pub fn load<A>(source: &A, registry: &[ModelEntry]) -> Result<Self, HeartcheckError>
    where
        A: ArtifactSource,
        A::Error: Into<ArtifactError>,
    {
        tracing::info!("Loading scalers and {} models...", registry.len());

        let scalers = source
            .load_scalers()
            .map_err(|e| HeartcheckError::Artifact(e.into()))?;
        let models = registry
            .iter()
            .map(|entry| {
                source
                    .load_model(entry)
                    .map(|classifier| NamedModel {
                        name: entry.name.to_string(),
                        classifier,
                    })
                    .map_err(|e| HeartcheckError::Artifact(e.into()))
            })
            .collect::<Result<Vec<_>, HeartcheckError>>()?;

        Self::new(scalers, models)
    }

    /// Model names in the order they run.
    #[must_use]
    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    #[must_use]
    pub fn scale(&self, raw: &FeatureVector) -> FeatureVector {
        self.scalers.apply(raw)
    }

    /// Run the full pipeline for one request.
    ///
    /// Every model sees the same scaled vector and reports independently.
    ///
    /// # Errors
    /// Returns `HeartcheckError::Encoding` for an unmapped label, or
    /// `HeartcheckError::Model` if any model fails. No partial report is
    /// returned.
    pub fn predict(&self, input: &RawInput) -> Result<PredictionReport, HeartcheckError> {
        let raw = encode(input)?;
        let scaled = self.scale(&raw);
        tracing::debug!("Encoded and scaled request, running {} models", self.models.len());

        let predictions = self
            .models
            .iter()
            .map(|model| {
                let verdict = model.classifier.predict(&scaled).map_err(|source| {
                    HeartcheckError::Model {
                        model: model.name.clone(),
                        source,
                    }
                })?;
                Ok(ModelPrediction {
                    model: model.name.clone(),
                    family: model.classifier.family(),
                    verdict,
                    probability: model.classifier.predict_proba(&scaled),
                })
            })
            .collect::<Result<Vec<_>, HeartcheckError>>()?;

        let positives = predictions.iter().filter(|p| p.verdict.is_positive()).count();
        tracing::info!(
            "Prediction complete: {}/{} models positive",
            positives,
            predictions.len()
        );

        Ok(PredictionReport::new(raw, scaled, predictions))
    }
}
