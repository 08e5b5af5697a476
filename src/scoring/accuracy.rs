//! Prediction accuracy against recorded exam scores

use serde::Serialize;

use super::engine::PredictionStatus;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `max(0, 100 - |predicted - actual|)`, rounded to two decimals
pub fn accuracy(prediction_score: f64, exam_score: f64) -> f64 {
    round2((100.0 - (prediction_score - exam_score).abs()).max(0.0))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusDistribution {
    pub success: i64,
    pub at_risk: i64,
    pub fail: i64,
}

impl StatusDistribution {
    pub fn record(&mut self, status: PredictionStatus, count: i64) {
        match status {
            PredictionStatus::Success => self.success += count,
            PredictionStatus::AtRisk => self.at_risk += count,
            PredictionStatus::Fail => self.fail += count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccuracyRange {
    pub min: f64,
    pub max: f64,
}

/// Aggregate accuracy of predictions that have an exam score
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatistics {
    pub total_predictions: usize,
    pub average_accuracy: f64,
    pub model_performance: &'static str,
    pub remote_predictor_status: &'static str,
    pub category_distribution: StatusDistribution,
    pub accuracy_range: Option<AccuracyRange>,
}

fn performance_label(average: f64) -> &'static str {
    match average {
        a if a >= 80.0 => "Excellent",
        a if a >= 70.0 => "Good",
        a if a >= 60.0 => "Fair",
        _ => "Poor",
    }
}

impl ModelStatistics {
    /// Build statistics from `(prediction_score, exam_score)` pairs
    pub fn from_pairs(pairs: &[(f64, f64)], remote_predictor_status: &'static str) -> Self {
        if pairs.is_empty() {
            return Self {
                total_predictions: 0,
                average_accuracy: 0.0,
                model_performance: "Insufficient data",
                remote_predictor_status,
                category_distribution: StatusDistribution::default(),
                accuracy_range: None,
            };
        }

        let accuracies: Vec<f64> = pairs.iter().map(|(p, e)| accuracy(*p, *e)).collect();
        let average = accuracies.iter().sum::<f64>() / accuracies.len() as f64;
        let min = accuracies.iter().copied().fold(f64::INFINITY, f64::min);
        let max = accuracies.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut distribution = StatusDistribution::default();
        for (score, _) in pairs {
            distribution.record(PredictionStatus::from_score(*score), 1);
        }

        Self {
            total_predictions: pairs.len(),
            average_accuracy: round2(average),
            model_performance: performance_label(average),
            remote_predictor_status,
            category_distribution: distribution,
            accuracy_range: Some(AccuracyRange { min: round2(min), max: round2(max) }),
        }
    }
}
