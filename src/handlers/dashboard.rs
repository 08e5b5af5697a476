//! Dashboard handlers

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;
use uuid::Uuid;

use crate::{AppState, AppResult};
use crate::models::Student;
use crate::middleware::auth::UserContext;
use crate::scoring::accuracy::StatusDistribution;
use crate::scoring::PredictionStatus;

/// Sleep at or above this many hours counts as sufficient
const SUFFICIENT_SLEEP_HOURS: f64 = 7.0;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_students: i64,
    pub prediction_stats: StatusDistribution,
    pub recent_predictions: Vec<RecentPrediction>,
    pub class_performance: Vec<ClassPerformance>,
    pub factor_success_rate: FactorSuccessRate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_stats: Option<Vec<TeacherStat>>,
}

#[derive(Debug, Serialize)]
pub struct RecentStudent {
    pub id: Uuid,
    pub name: String,
    pub grade: String,
    pub class: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPrediction {
    pub id: Uuid,
    pub prediction_score: f64,
    pub prediction_status: String,
    pub prediction_category: &'static str,
    pub created_at: DateTime<Utc>,
    pub student: RecentStudent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPerformance {
    pub class: String,
    pub average_score: f64,
    pub prediction_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherStat {
    pub id: Uuid,
    pub name: String,
    pub student_count: i64,
}

/// Status counts for one side of a boolean factor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FactorBucket {
    #[serde(flatten)]
    pub statuses: StatusDistribution,
    pub total: i64,
}

impl FactorBucket {
    fn record(&mut self, status: PredictionStatus) {
        self.statuses.record(status, 1);
        self.total += 1;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FactorSplit {
    #[serde(rename = "true")]
    pub present: FactorBucket,
    #[serde(rename = "false")]
    pub absent: FactorBucket,
}

impl FactorSplit {
    fn record(&mut self, present: bool, status: PredictionStatus) {
        if present {
            self.present.record(status);
        } else {
            self.absent.record(status);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorSuccessRate {
    pub extracurricular_activities: FactorSplit,
    pub sleep_hours: FactorSplit,
    pub learning_disabilities: FactorSplit,
}

/// Per-prediction factor flags used for the success-rate breakdown
#[derive(Debug, Clone, Copy)]
pub struct FactorRow {
    pub status: PredictionStatus,
    pub extracurricular: bool,
    pub sleep_hours: f64,
    pub learning_disability: bool,
}

impl FactorSuccessRate {
    pub fn tally(rows: &[FactorRow]) -> Self {
        let mut rates = Self::default();
        for row in rows {
            rates.extracurricular_activities.record(row.extracurricular, row.status);
            rates.sleep_hours.record(row.sleep_hours >= SUFFICIENT_SLEEP_HOURS, row.status);
            rates.learning_disabilities.record(row.learning_disability, row.status);
        }
        rates
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Dashboard statistics, scoped to the caller's students unless admin
pub async fn stats(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<DashboardStats>> {
    let owner = user.owner_scope();

    let total_students = Student::count(&state.pool, owner).await?;

    // Status counts
    let rows = sqlx::query(
        r#"
        SELECT p.prediction_status, COUNT(*) AS count
        FROM predictions p
        JOIN students s ON s.id = p.student_id
        WHERE ($1::uuid IS NULL OR s.user_id = $1)
        GROUP BY p.prediction_status
        "#
    )
    .bind(owner)
    .fetch_all(&state.pool)
    .await?;

    let mut prediction_stats = StatusDistribution::default();
    for row in &rows {
        let status: String = row.get("prediction_status");
        if let Some(status) = PredictionStatus::parse(&status) {
            prediction_stats.record(status, row.get("count"));
        }
    }

    // Recent predictions
    let recent_predictions = sqlx::query(
        r#"
        SELECT p.id, p.prediction_score, p.prediction_status, p.created_at,
               s.id AS student_id, s.name, s.grade, s.class_name
        FROM predictions p
        JOIN students s ON s.id = p.student_id
        WHERE ($1::uuid IS NULL OR s.user_id = $1)
        ORDER BY p.created_at DESC
        LIMIT 5
        "#
    )
    .bind(owner)
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(|row| {
        let score: f64 = row.get("prediction_score");
        RecentPrediction {
            id: row.get("id"),
            prediction_score: score,
            prediction_status: row.get("prediction_status"),
            prediction_category: PredictionStatus::from_score(score).category(),
            created_at: row.get("created_at"),
            student: RecentStudent {
                id: row.get("student_id"),
                name: row.get("name"),
                grade: row.get("grade"),
                class: row.get("class_name"),
            },
        }
    })
    .collect();

    // Class performance
    let class_performance = sqlx::query(
        r#"
        SELECT s.class_name, AVG(p.prediction_score)::float8 AS average_score, COUNT(p.id) AS prediction_count
        FROM predictions p
        JOIN students s ON s.id = p.student_id
        WHERE ($1::uuid IS NULL OR s.user_id = $1)
        GROUP BY s.class_name
        ORDER BY s.class_name
        "#
    )
    .bind(owner)
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(|row| ClassPerformance {
        class: row.get("class_name"),
        average_score: round1(row.get::<Option<f64>, _>("average_score").unwrap_or(0.0)),
        prediction_count: row.get("prediction_count"),
    })
    .collect();

    // Factor breakdown
    let factor_rows: Vec<FactorRow> = sqlx::query(
        r#"
        SELECT p.prediction_score, p.extracurricular_activities, p.sleep_hours, p.learning_disabilities
        FROM predictions p
        JOIN students s ON s.id = p.student_id
        WHERE ($1::uuid IS NULL OR s.user_id = $1)
        "#
    )
    .bind(owner)
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(|row| FactorRow {
        status: PredictionStatus::from_score(row.get("prediction_score")),
        extracurricular: row.get("extracurricular_activities"),
        sleep_hours: row.get("sleep_hours"),
        learning_disability: row.get("learning_disabilities"),
    })
    .collect();

    let teacher_stats = if user.is_admin() {
        let teachers = sqlx::query(
            r#"
            SELECT u.id, u.name, COUNT(s.id) AS student_count
            FROM users u
            LEFT JOIN students s ON s.user_id = u.id
            WHERE u.role = 'teacher'
            GROUP BY u.id, u.name
            ORDER BY u.name
            "#
        )
        .fetch_all(&state.pool)
        .await?
        .into_iter()
        .map(|row| TeacherStat {
            id: row.get("id"),
            name: row.get("name"),
            student_count: row.get("student_count"),
        })
        .collect();
        Some(teachers)
    } else {
        None
    };

    Ok(Json(DashboardStats {
        total_students,
        prediction_stats,
        recent_predictions,
        class_performance,
        factor_success_rate: FactorSuccessRate::tally(&factor_rows),
        teacher_stats,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: PredictionStatus, extracurricular: bool, sleep_hours: f64, learning_disability: bool) -> FactorRow {
        FactorRow { status, extracurricular, sleep_hours, learning_disability }
    }

    #[test]
    fn test_factor_tally() {
        let rows = [
            row(PredictionStatus::Success, true, 8.0, false),
            row(PredictionStatus::AtRisk, false, 7.0, false),
            row(PredictionStatus::Fail, false, 5.5, true),
        ];

        let rates = FactorSuccessRate::tally(&rows);

        assert_eq!(rates.extracurricular_activities.present.statuses.success, 1);
        assert_eq!(rates.extracurricular_activities.absent.total, 2);
        assert_eq!(rates.sleep_hours.present.total, 2);
        assert_eq!(rates.sleep_hours.absent.statuses.fail, 1);
        assert_eq!(rates.learning_disabilities.present.statuses.fail, 1);
        assert_eq!(rates.learning_disabilities.absent.statuses.at_risk, 1);
    }

    #[test]
    fn test_factor_json_shape() {
        let rates = FactorSuccessRate::tally(&[row(PredictionStatus::Success, true, 9.0, false)]);
        let json = serde_json::to_value(rates).unwrap();

        assert_eq!(json["extracurricularActivities"]["true"]["success"], 1);
        assert_eq!(json["extracurricularActivities"]["true"]["total"], 1);
        assert_eq!(json["sleepHours"]["false"]["total"], 0);
        assert_eq!(json["learningDisabilities"]["false"]["at_risk"], 0);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(66.04), 66.0);
        assert_eq!(round1(71.26), 71.3);
    }
}
