//! Prediction model

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use validator::Validate;

use crate::scoring::accuracy::accuracy;
use crate::scoring::batch::BatchItem;
use crate::scoring::{FeatureInput, FeatureVector, Prediction, PredictionStatus};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub hours_studied: f64,
    pub attendance: f64,
    pub extracurricular_activities: bool,
    pub sleep_hours: f64,
    pub previous_scores: f64,
    pub motivation_level: f64,
    pub tutoring_sessions: i32,
    pub teacher_quality: f64,
    pub physical_activity: f64,
    pub learning_disabilities: bool,
    pub exam_score: Option<f64>,
    pub prediction_score: f64,
    pub prediction_status: String,
    pub intervention_recommendations: Json<Vec<String>>,
    pub model_used: String,
    pub semester: String,
    pub academic_year: String,
    pub created_by: Option<Uuid>,
    pub prediction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of a single prediction request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PredictionInput {
    #[serde(flatten)]
    #[validate(nested)]
    pub features: FeatureInput,
    #[validate(length(min = 1, max = 50))]
    pub semester: String,
    #[validate(length(min = 1, max = 20))]
    pub academic_year: String,
}

/// One entry of a bulk request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPredictionItem {
    pub student_id: Uuid,
    #[serde(flatten)]
    pub input: PredictionInput,
}

/// Bulk entry kept as raw JSON so a malformed entry fails on its own
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RawBulkItem(pub serde_json::Value);

impl RawBulkItem {
    pub fn parse(self) -> Result<BulkPredictionItem, serde_json::Error> {
        serde_json::from_value(self.0)
    }
}

impl BatchItem for RawBulkItem {
    fn student_id(&self) -> Option<Uuid> {
        self.0
            .get("studentId")
            .and_then(|id| id.as_str())
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkPredictionRequest {
    pub predictions: Vec<RawBulkItem>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExamScore {
    #[validate(range(min = 0.0, max = 100.0))]
    pub exam_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.filter(|l| *l > 0).unwrap_or(10).min(100)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

/// Student fields embedded in prediction responses
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StudentSummary {
    pub id: Uuid,
    pub name: String,
    pub gender: String,
}

/// Prediction as returned by the API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionView {
    #[serde(flatten)]
    pub record: PredictionRecord,
    pub prediction_category: &'static str,
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentSummary>,
}

impl PredictionRecord {
    pub fn status(&self) -> PredictionStatus {
        PredictionStatus::from_score(self.prediction_score)
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.exam_score.map(|exam| accuracy(self.prediction_score, exam))
    }

    pub fn into_view(self, student: Option<StudentSummary>) -> PredictionView {
        PredictionView {
            prediction_category: self.status().category(),
            accuracy: self.accuracy(),
            student,
            record: self,
        }
    }

    pub async fn create(
        pool: &PgPool,
        student_id: Uuid,
        created_by: Uuid,
        features: &FeatureVector,
        input: &PredictionInput,
        result: &Prediction,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PredictionRecord>(
            r#"
            INSERT INTO predictions (
                student_id, hours_studied, attendance, extracurricular_activities, sleep_hours,
                previous_scores, motivation_level, tutoring_sessions, teacher_quality,
                physical_activity, learning_disabilities, exam_score, prediction_score,
                prediction_status, intervention_recommendations, model_used, semester,
                academic_year, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING *
            "#
        )
        .bind(student_id)
        .bind(features.hours_studied)
        .bind(features.attendance)
        .bind(features.extracurricular)
        .bind(features.sleep_hours)
        .bind(features.previous_scores)
        .bind(features.motivation)
        .bind(features.tutoring_sessions as i32)
        .bind(features.teacher_quality)
        .bind(features.physical_activity)
        .bind(features.learning_disability)
        .bind(input.features.exam_score)
        .bind(result.prediction_score)
        .bind(result.prediction_status.as_str())
        .bind(Json(&result.intervention_recommendations))
        .bind(result.source.model_used())
        .bind(&input.semester)
        .bind(&input.academic_year)
        .bind(created_by)
        .fetch_one(pool)
        .await
    }

    /// Find a prediction whose student is visible to `owner`
    pub async fn find_scoped(
        pool: &PgPool,
        id: Uuid,
        owner: Option<Uuid>,
    ) -> Result<Option<(Self, StudentSummary)>, sqlx::Error> {
        let Some(record) = sqlx::query_as::<_, PredictionRecord>(
            r#"
            SELECT p.* FROM predictions p
            JOIN students s ON s.id = p.student_id
            WHERE p.id = $1 AND ($2::uuid IS NULL OR s.user_id = $2)
            "#
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(pool)
        .await?
        else {
            return Ok(None);
        };

        let student = sqlx::query_as::<_, StudentSummary>(
            "SELECT id, name, gender FROM students WHERE id = $1"
        )
        .bind(record.student_id)
        .fetch_one(pool)
        .await?;

        Ok(Some((record, student)))
    }

    pub async fn list_by_student(
        pool: &PgPool,
        student_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM predictions WHERE student_id = $1"
        )
        .bind(student_id)
        .fetch_one(pool)
        .await?;

        let rows = sqlx::query_as::<_, PredictionRecord>(
            r#"
            SELECT * FROM predictions
            WHERE student_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        )
        .bind(student_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok((rows, total))
    }

    pub async fn all_for_student(pool: &PgPool, student_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PredictionRecord>(
            "SELECT * FROM predictions WHERE student_id = $1 ORDER BY created_at DESC"
        )
        .bind(student_id)
        .fetch_all(pool)
        .await
    }

    /// Only the exam score is mutable after creation
    pub async fn set_exam_score(pool: &PgPool, id: Uuid, exam_score: f64) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PredictionRecord>(
            r#"
            UPDATE predictions
            SET exam_score = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(id)
        .bind(exam_score)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM predictions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// `(prediction_score, exam_score)` pairs for scored predictions
    pub async fn scored_pairs(pool: &PgPool, owner: Option<Uuid>) -> Result<Vec<(f64, f64)>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT p.prediction_score, p.exam_score FROM predictions p
            JOIN students s ON s.id = p.student_id
            WHERE p.exam_score IS NOT NULL AND ($1::uuid IS NULL OR s.user_id = $1)
            "#
        )
        .bind(owner)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|r| {
            (r.get::<f64, _>("prediction_score"), r.get::<f64, _>("exam_score"))
        }).collect())
    }
}
