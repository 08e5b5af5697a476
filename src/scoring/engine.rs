//! Heuristic scoring engine
//!
//! Additive point budget over the canonical feature vector. Each factor
//! contributes up to a fixed number of points; the total is clamped to
//! [0, 100] and rounded to one decimal before the status is derived.

use serde::{Deserialize, Serialize};

use super::features::FeatureVector;

/// Lower bound (inclusive) of the `success` band
pub const SUCCESS_THRESHOLD: f64 = 70.0;
/// Lower bound (inclusive) of the `at_risk` band
pub const AT_RISK_THRESHOLD: f64 = 50.0;

/// Score returned when the input cannot be scored
pub const SAFE_DEFAULT_SCORE: f64 = 50.0;

/// Categorical risk label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Success,
    AtRisk,
    Fail,
}

impl PredictionStatus {
    /// Fixed threshold table
    pub fn from_score(score: f64) -> Self {
        if score >= SUCCESS_THRESHOLD {
            PredictionStatus::Success
        } else if score >= AT_RISK_THRESHOLD {
            PredictionStatus::AtRisk
        } else {
            PredictionStatus::Fail
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionStatus::Success => "success",
            PredictionStatus::AtRisk => "at_risk",
            PredictionStatus::Fail => "fail",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(PredictionStatus::Success),
            "at_risk" => Some(PredictionStatus::AtRisk),
            "fail" => Some(PredictionStatus::Fail),
            _ => None,
        }
    }

    /// Display label shown next to the score
    pub fn category(&self) -> &'static str {
        match self {
            PredictionStatus::Success => "Successful",
            PredictionStatus::AtRisk => "Adequate",
            PredictionStatus::Fail => "Failing",
        }
    }
}

/// A score paired with the status the threshold table assigns to it.
///
/// The only way to build one is from a raw value, so the pair can never
/// disagree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    value: f64,
    status: PredictionStatus,
}

impl Score {
    /// Clamp to [0, 100], round to one decimal and classify.
    /// Non-finite values classify as the safe default.
    pub fn from_value(raw: f64) -> Self {
        let value = if raw.is_finite() {
            (raw.clamp(0.0, 100.0) * 10.0).round() / 10.0
        } else {
            SAFE_DEFAULT_SCORE
        };

        Self {
            value,
            status: PredictionStatus::from_score(value),
        }
    }

    pub fn safe_default() -> Self {
        Self::from_value(SAFE_DEFAULT_SCORE)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn status(&self) -> PredictionStatus {
        self.status
    }
}

/// Outcome of a local scoring run
#[derive(Debug, Clone, PartialEq)]
pub enum Scored {
    /// Computed from the features
    Computed(Score),
    /// Features were malformed; the safe default was substituted
    Recovered { score: Score, reason: String },
}

impl Scored {
    pub fn score(&self) -> Score {
        match self {
            Scored::Computed(score) | Scored::Recovered { score, .. } => *score,
        }
    }
}

/// Score a feature vector. Never fails: malformed input yields
/// [`Scored::Recovered`] with the safe default.
pub fn score(features: &FeatureVector) -> Scored {
    if !features.is_well_formed() {
        return Scored::Recovered {
            score: Score::safe_default(),
            reason: "feature vector contains non-finite values".to_string(),
        };
    }

    Scored::Computed(Score::from_value(raw_points(features)))
}

fn raw_points(f: &FeatureVector) -> f64 {
    let mut points = 0.0;

    // Study factors
    points += (f.hours_studied.min(10.0) / 10.0) * 15.0;
    points += (f.attendance / 100.0) * 15.0;
    points += (f.previous_scores / 100.0) * 20.0;
    points += (f.motivation / 10.0) * 10.0;

    // Support factors
    points += f.tutoring_sessions.min(5) as f64 * 2.0;
    points += (f.teacher_quality / 10.0) * 10.0;
    if f.extracurricular {
        points += 5.0;
    }

    // Well-being factors
    points += if f.sleep_hours >= 7.0 {
        5.0
    } else {
        (f.sleep_hours / 7.0) * 5.0
    };
    points += (f.physical_activity / 10.0) * 5.0;
    if f.learning_disability {
        points -= 5.0;
    }

    points
}
