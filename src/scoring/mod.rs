//! Prediction scoring core
//!
//! ```text
//!  FeatureInput ──resolve──► FeatureVector ──► engine::score ──► Score
//!                                   │                              │
//!                                   └────────► recommend ◄─────────┘
//!                                                  │
//!                                                  ▼
//!                                              Prediction
//! ```
//!
//! [`remote::Predictor`] may replace the engine with an external service; it
//! always produces the same [`Prediction`] shape.

pub mod accuracy;
pub mod batch;
pub mod engine;
pub mod features;
pub mod recommend;
pub mod remote;

use serde::{Deserialize, Serialize};

pub use engine::{PredictionStatus, Score, Scored};
pub use features::{FeatureInput, FeatureVector, Gender};

/// Per-status probabilities reported by the remote model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub success: f64,
    pub at_risk: f64,
    pub fail: f64,
}

/// Which code path produced a prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionSource {
    Remote { model: String },
    Local,
    LocalFallback { cause: String },
    SafeDefault { cause: String },
}

impl PredictionSource {
    /// Short label persisted with the prediction record
    pub fn model_used(&self) -> String {
        match self {
            PredictionSource::Remote { model } => model.clone(),
            PredictionSource::Local => "local-heuristic".to_string(),
            PredictionSource::LocalFallback { .. } => "local-heuristic (fallback)".to_string(),
            PredictionSource::SafeDefault { .. } => "safe-default".to_string(),
        }
    }
}

/// Scored result ready to be persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub prediction_score: f64,
    pub prediction_status: PredictionStatus,
    pub prediction_category: &'static str,
    pub intervention_recommendations: Vec<String>,
    pub probabilities: Option<Probabilities>,
    pub source: PredictionSource,
}

impl Prediction {
    fn assemble(
        score: Score,
        recommendations: Vec<String>,
        probabilities: Option<Probabilities>,
        source: PredictionSource,
    ) -> Self {
        Self {
            prediction_score: score.value(),
            prediction_status: score.status(),
            prediction_category: score.status().category(),
            intervention_recommendations: recommendations,
            probabilities,
            source,
        }
    }
}

/// Inputs for one prediction
#[derive(Debug, Clone, Copy)]
pub struct PredictionRequest {
    pub features: FeatureVector,
    pub gender: Gender,
    pub exam_score: Option<f64>,
}

/// Score with the local engine and attach recommendations
pub fn predict_local(features: &FeatureVector) -> Prediction {
    let (score, source) = match engine::score(features) {
        Scored::Computed(score) => (score, PredictionSource::Local),
        Scored::Recovered { score, reason } => {
            tracing::warn!("Scoring recovered with safe default: {}", reason);
            (score, PredictionSource::SafeDefault { cause: reason })
        }
    };

    let recommendations = recommend::recommend(features, score.status());
    Prediction::assemble(score, recommendations, None, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> FeatureVector {
        FeatureVector {
            hours_studied: 5.0,
            attendance: 90.0,
            sleep_hours: 8.0,
            previous_scores: 75.0,
            motivation: 7.0,
            tutoring_sessions: 2,
            teacher_quality: 7.0,
            physical_activity: 4.0,
            extracurricular: true,
            learning_disability: false,
        }
    }

    #[test]
    fn test_local_prediction_is_consistent() {
        let prediction = predict_local(&features());

        assert_eq!(prediction.prediction_score, 66.0);
        assert_eq!(prediction.prediction_status, PredictionStatus::AtRisk);
        assert_eq!(prediction.prediction_category, "Adequate");
        assert_eq!(prediction.source, PredictionSource::Local);
        assert!(prediction.probabilities.is_none());
        assert!(prediction.intervention_recommendations[0].contains("at risk"));
    }

    #[test]
    fn test_local_prediction_safe_default() {
        let broken = FeatureVector { hours_studied: f64::INFINITY, ..features() };
        let prediction = predict_local(&broken);

        assert_eq!(prediction.prediction_score, 50.0);
        assert_eq!(prediction.prediction_status, PredictionStatus::AtRisk);
        assert!(matches!(prediction.source, PredictionSource::SafeDefault { .. }));
        assert_eq!(prediction.source.model_used(), "safe-default");
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(predict_local(&features())).unwrap();

        assert_eq!(json["predictionStatus"], "at_risk");
        assert_eq!(json["source"]["kind"], "local");
        assert!(json["interventionRecommendations"].is_array());
    }
}
