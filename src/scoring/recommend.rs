//! Intervention recommendations
//!
//! Each recommendation is gated by one predicate over the features and the
//! derived status. Output order is fixed so identical input always yields
//! identical text.

use std::fmt;

use super::engine::PredictionStatus;
use super::features::FeatureVector;

const MIN_STUDY_HOURS: f64 = 3.0;
const MIN_ATTENDANCE: f64 = 80.0;
const MIN_SLEEP_HOURS: f64 = 7.0;
const LOW_MOTIVATION: f64 = 5.0;
const MIN_PHYSICAL_ACTIVITY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    StatusSummary(PredictionStatus),
    IncreaseStudyTime,
    ImproveAttendance,
    MoreSleep,
    BoostMotivation,
    AddTutoring,
    JoinExtracurricular,
    AddPhysicalActivity,
    LearningSupport,
    ReviewProgress,
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Advice::StatusSummary(PredictionStatus::Success) => {
                "Student is on track to succeed; keep reinforcing current study habits."
            }
            Advice::StatusSummary(PredictionStatus::AtRisk) => {
                "Student is at risk of academic failure and needs extra attention."
            }
            Advice::StatusSummary(PredictionStatus::Fail) => {
                "Student has a high risk of failing and needs immediate intervention."
            }
            Advice::IncreaseStudyTime => "Increase study time to at least 3-4 hours per day.",
            Advice::ImproveAttendance => "Improve class attendance; the expected minimum is 80%.",
            Advice::MoreSleep => {
                "Ensure 7-8 hours of sleep per night to support concentration and memory."
            }
            Advice::BoostMotivation => {
                "Provide motivational support and schedule counseling sessions."
            }
            Advice::AddTutoring => "Consider additional tutoring sessions for difficult subjects.",
            Advice::JoinExtracurricular => {
                "Consider joining an extracurricular activity to build social and leadership skills."
            }
            Advice::AddPhysicalActivity => {
                "Add regular physical activity to improve health and cognitive performance."
            }
            Advice::LearningSupport => {
                "Arrange specialised support and adapted learning strategies with an academic counselor."
            }
            Advice::ReviewProgress => "Review progress again after the next assessment period.",
        };
        f.write_str(text)
    }
}

/// Applicable advice in output order
pub fn advise(features: &FeatureVector, status: PredictionStatus) -> Vec<Advice> {
    let needs_support = status != PredictionStatus::Success;

    let gates = [
        (true, Advice::StatusSummary(status)),
        (features.hours_studied < MIN_STUDY_HOURS, Advice::IncreaseStudyTime),
        (features.attendance < MIN_ATTENDANCE, Advice::ImproveAttendance),
        (features.sleep_hours < MIN_SLEEP_HOURS, Advice::MoreSleep),
        (features.motivation < LOW_MOTIVATION, Advice::BoostMotivation),
        (features.tutoring_sessions == 0 && needs_support, Advice::AddTutoring),
        (!features.extracurricular, Advice::JoinExtracurricular),
        (features.physical_activity < MIN_PHYSICAL_ACTIVITY, Advice::AddPhysicalActivity),
        (features.learning_disability, Advice::LearningSupport),
        (true, Advice::ReviewProgress),
    ];

    gates
        .into_iter()
        .filter_map(|(applies, advice)| applies.then_some(advice))
        .collect()
}

/// Recommendation texts in output order
pub fn recommend(features: &FeatureVector, status: PredictionStatus) -> Vec<String> {
    advise(features, status).iter().map(ToString::to_string).collect()
}
