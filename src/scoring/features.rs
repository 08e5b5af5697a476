//! Feature input boundary
//!
//! Request payloads arrive as [`FeatureInput`], where ordinal attributes may be
//! either a `Low`/`Medium`/`High` label or a 1-10 integer. They are resolved
//! exactly once into a [`FeatureVector`] on the canonical numeric scale; the
//! scoring engine never sees labels.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Three-level ordinal label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    /// Position on the canonical 1-10 scale
    pub fn scale(self) -> f64 {
        match self {
            Level::High => 8.0,
            Level::Medium => 5.0,
            Level::Low => 2.0,
        }
    }

    /// Nearest label for a canonical scale value
    pub fn from_scale(value: f64) -> Self {
        if value >= 7.0 {
            Level::High
        } else if value >= 4.0 {
            Level::Medium
        } else {
            Level::Low
        }
    }
}

/// Ordinal attribute as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelInput {
    Label(Level),
    Scale(f64),
}

impl LevelInput {
    pub fn resolve(self) -> f64 {
        match self {
            LevelInput::Label(level) => level.scale(),
            LevelInput::Scale(value) => value,
        }
    }
}

fn validate_level(level: &LevelInput) -> Result<(), ValidationError> {
    match level {
        LevelInput::Scale(value) if value.fract() != 0.0 => {
            Err(ValidationError::new("level_not_integer"))
        }
        LevelInput::Scale(value) if !(1.0..=10.0).contains(value) => {
            Err(ValidationError::new("level_out_of_range"))
        }
        _ => Ok(()),
    }
}

/// Student attributes as submitted by clients
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FeatureInput {
    #[validate(range(min = 0.0, max = 24.0))]
    pub hours_studied: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub attendance: f64,
    pub extracurricular_activities: bool,
    #[validate(range(min = 0.0, max = 24.0))]
    pub sleep_hours: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub previous_scores: f64,
    #[validate(custom(function = "validate_level"))]
    pub motivation_level: LevelInput,
    #[validate(range(min = 0))]
    pub tutoring_sessions: i32,
    #[validate(custom(function = "validate_level"))]
    pub teacher_quality: LevelInput,
    #[validate(range(min = 0.0, max = 10.0))]
    pub physical_activity: f64,
    pub learning_disabilities: bool,
    #[validate(range(min = 0.0, max = 100.0))]
    #[serde(default)]
    pub exam_score: Option<f64>,
}

impl FeatureInput {
    /// Resolve into the canonical feature vector
    pub fn resolve(&self) -> FeatureVector {
        FeatureVector {
            hours_studied: self.hours_studied,
            attendance: self.attendance,
            sleep_hours: self.sleep_hours,
            previous_scores: self.previous_scores,
            motivation: self.motivation_level.resolve(),
            tutoring_sessions: self.tutoring_sessions.max(0) as u32,
            teacher_quality: self.teacher_quality.resolve(),
            physical_activity: self.physical_activity,
            extracurricular: self.extracurricular_activities,
            learning_disability: self.learning_disabilities,
        }
    }
}

/// Canonical feature vector consumed by the scoring engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    pub hours_studied: f64,
    pub attendance: f64,
    pub sleep_hours: f64,
    pub previous_scores: f64,
    /// 1-10
    pub motivation: f64,
    pub tutoring_sessions: u32,
    /// 1-10
    pub teacher_quality: f64,
    pub physical_activity: f64,
    pub extracurricular: bool,
    pub learning_disability: bool,
}

impl FeatureVector {
    /// True when every numeric attribute is a finite number
    pub fn is_well_formed(&self) -> bool {
        [
            self.hours_studied,
            self.attendance,
            self.sleep_hours,
            self.previous_scores,
            self.motivation,
            self.teacher_quality,
            self.physical_activity,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Student gender, only forwarded to the remote predictor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(motivation: serde_json::Value, quality: serde_json::Value) -> serde_json::Value {
        json!({
            "hoursStudied": 4,
            "attendance": 85.5,
            "extracurricularActivities": false,
            "sleepHours": 7,
            "previousScores": 70,
            "motivationLevel": motivation,
            "tutoringSessions": 1,
            "teacherQuality": quality,
            "physicalActivity": 3,
            "learningDisabilities": false
        })
    }

    #[test]
    fn test_labels_resolve_to_canonical_scale() {
        let parsed: FeatureInput = serde_json::from_value(input(json!("High"), json!("Low"))).unwrap();
        let vector = parsed.resolve();

        assert_eq!(parsed.motivation_level, LevelInput::Label(Level::High));
        assert_eq!(vector.motivation, 8.0);
        assert_eq!(vector.teacher_quality, 2.0);
        assert_eq!(vector.hours_studied, 4.0);
        assert!(parsed.exam_score.is_none());
    }

    #[test]
    fn test_numeric_levels_pass_through() {
        let parsed: FeatureInput = serde_json::from_value(input(json!(6), json!("Medium"))).unwrap();
        let vector = parsed.resolve();

        assert_eq!(vector.motivation, 6.0);
        assert_eq!(vector.teacher_quality, 5.0);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_unknown_label_rejected() {
        let result = serde_json::from_value::<FeatureInput>(input(json!("Extreme"), json!(5)));
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_values_fail_validation() {
        let parsed: FeatureInput = serde_json::from_value(input(json!(11), json!(5))).unwrap();
        let errors = parsed.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("motivation_level"));

        let mut raw = input(json!(5), json!(5));
        raw["attendance"] = json!(120);
        raw["examScore"] = json!(-1);
        let parsed: FeatureInput = serde_json::from_value(raw).unwrap();
        let errors = parsed.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("attendance"));
        assert!(errors.field_errors().contains_key("exam_score"));
    }

    #[test]
    fn test_integral_float_levels_accepted() {
        let parsed: FeatureInput = serde_json::from_value(input(json!(7.0), json!(3))).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.resolve().motivation, 7.0);

        let parsed: FeatureInput = serde_json::from_value(input(json!(6.5), json!(3))).unwrap();
        let errors = parsed.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("motivation_level"));
    }

    #[test]
    fn test_level_from_scale_round_trips_labels() {
        for level in [Level::Low, Level::Medium, Level::High] {
            assert_eq!(Level::from_scale(level.scale()), level);
        }
    }

    #[test]
    fn test_non_finite_vector_is_malformed() {
        let parsed: FeatureInput = serde_json::from_value(input(json!(5), json!(5))).unwrap();
        let mut vector = parsed.resolve();
        assert!(vector.is_well_formed());

        vector.sleep_hours = f64::NAN;
        assert!(!vector.is_well_formed());
    }
}
