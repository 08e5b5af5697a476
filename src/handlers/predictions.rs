//! Prediction handlers

use axum::{extract::{State, Path, Query}, http::StatusCode, Json};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, AppResult, AppError};
use crate::models::{
    BulkPredictionRequest, Pagination, PageQuery, PredictionInput,
    PredictionRecord, PredictionView, RawBulkItem, Student, StudentSummary, UpdateExamScore,
};
use crate::middleware::auth::UserContext;
use crate::scoring::accuracy::ModelStatistics;
use crate::scoring::batch::{self, BatchOutcome};
use crate::scoring::remote::RemoteHealth;
use crate::scoring::{predict_local, Prediction, PredictionRequest, PredictionSource, Probabilities};

/// Freshly created prediction with how it was produced
#[derive(Debug, Serialize)]
pub struct CreatedPrediction {
    #[serde(flatten)]
    pub prediction: PredictionView,
    pub source: PredictionSource,
    pub probabilities: Option<Probabilities>,
}

#[derive(Debug, Serialize)]
pub struct PredictionPage {
    pub predictions: Vec<PredictionView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedPrediction {
    pub deleted: bool,
    pub deleted_data: PredictionView,
}

#[derive(Debug, Serialize)]
pub struct PredictorHealth {
    pub status: &'static str,
    pub remote: RemoteHealth,
}

fn summary(student: &Student) -> StudentSummary {
    StudentSummary {
        id: student.id,
        name: student.name.clone(),
        gender: student.gender.clone(),
    }
}

async fn find_student(state: &AppState, user: &UserContext, id: Uuid) -> AppResult<Student> {
    Student::find_scoped(&state.pool, id, user.owner_scope())
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))
}

async fn find_prediction(
    state: &AppState,
    user: &UserContext,
    id: Uuid,
) -> AppResult<(PredictionRecord, StudentSummary)> {
    PredictionRecord::find_scoped(&state.pool, id, user.owner_scope())
        .await?
        .ok_or_else(|| AppError::NotFound("Prediction not found".to_string()))
}

async fn persist(
    state: &AppState,
    user: &UserContext,
    student: &Student,
    input: &PredictionInput,
    prediction: &Prediction,
) -> AppResult<PredictionView> {
    let features = input.features.resolve();
    let record = PredictionRecord::create(&state.pool, student.id, user.user_id, &features, input, prediction).await?;

    tracing::info!(
        "Prediction {} stored for student {}: {} ({}, {})",
        record.id, student.id, record.prediction_score, record.prediction_status, record.model_used
    );

    Ok(record.into_view(Some(summary(student))))
}

/// Score a student and store the prediction
pub async fn create(
    State(state): State<AppState>,
    user: UserContext,
    Path(student_id): Path<Uuid>,
    Json(input): Json<PredictionInput>,
) -> AppResult<(StatusCode, Json<CreatedPrediction>)> {
    input.validate()?;

    let student = find_student(&state, &user, student_id).await?;

    let request = PredictionRequest {
        features: input.features.resolve(),
        gender: student.gender(),
        exam_score: input.features.exam_score,
    };
    let prediction = state.predictor.predict(&request).await;
    let view = persist(&state, &user, &student, &input, &prediction).await?;

    Ok((StatusCode::CREATED, Json(CreatedPrediction {
        prediction: view,
        source: prediction.source,
        probabilities: prediction.probabilities,
    })))
}

/// Prediction history of one student, newest first
pub async fn list_for_student(
    State(state): State<AppState>,
    user: UserContext,
    Path(student_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PredictionPage>> {
    let student = find_student(&state, &user, student_id).await?;

    let page = query.page();
    let limit = query.limit();
    let (rows, total) = PredictionRecord::list_by_student(&state.pool, student.id, limit, query.offset()).await?;

    let predictions = rows
        .into_iter()
        .map(|p| p.into_view(Some(summary(&student))))
        .collect();

    Ok(Json(PredictionPage {
        predictions,
        pagination: Pagination::new(total, page, limit),
    }))
}

/// Get a single prediction
pub async fn get(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PredictionView>> {
    let (record, student) = find_prediction(&state, &user, id).await?;
    Ok(Json(record.into_view(Some(student))))
}

/// Record the actual exam score; the response carries the resulting accuracy
pub async fn update_exam_score(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateExamScore>,
) -> AppResult<Json<PredictionView>> {
    req.validate()?;

    let (record, student) = find_prediction(&state, &user, id).await?;
    let updated = PredictionRecord::set_exam_score(&state.pool, record.id, req.exam_score).await?;

    tracing::info!("Exam score recorded for prediction {}: {}", updated.id, req.exam_score);

    Ok(Json(updated.into_view(Some(student))))
}

/// Delete a prediction
pub async fn delete(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DeletedPrediction>> {
    let (record, student) = find_prediction(&state, &user, id).await?;

    if !PredictionRecord::delete(&state.pool, record.id).await? {
        return Err(AppError::NotFound("Prediction not found".to_string()));
    }

    tracing::info!("Prediction deleted: {}", record.id);

    Ok(Json(DeletedPrediction {
        deleted: true,
        deleted_data: record.into_view(Some(student)),
    }))
}

/// Score many students with the local engine. Each item succeeds or fails on
/// its own.
pub async fn bulk(
    State(state): State<AppState>,
    user: UserContext,
    Json(req): Json<BulkPredictionRequest>,
) -> AppResult<Json<BatchOutcome<PredictionView>>> {
    if req.predictions.is_empty() {
        return Err(AppError::ValidationError("Predictions array is required".to_string()));
    }

    let state = &state;
    let user = &user;

    let outcome = batch::run(req.predictions, move |_, entry: RawBulkItem| async move {
        let item = entry.parse().map_err(|e| AppError::ValidationError(e.to_string()))?;
        item.input.validate()?;

        let student = find_student(state, user, item.student_id).await?;
        let prediction = predict_local(&item.input.features.resolve());
        persist(state, user, &student, &item.input, &prediction).await
    })
    .await;

    tracing::info!(
        "Bulk prediction finished: {}/{} succeeded",
        outcome.summary.successful, outcome.summary.total
    );

    Ok(Json(outcome))
}

/// Accuracy statistics over predictions with a recorded exam score
pub async fn statistics(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<ModelStatistics>> {
    let pairs = PredictionRecord::scored_pairs(&state.pool, user.owner_scope()).await?;
    let remote_status = state.predictor.status_label().await;

    Ok(Json(ModelStatistics::from_pairs(&pairs, remote_status)))
}

/// Remote predictor health, 503 when it cannot serve predictions
pub async fn ml_health(State(state): State<AppState>) -> AppResult<Json<PredictorHealth>> {
    if !state.predictor.is_enabled() {
        return Err(AppError::ServiceUnavailable("ML predictor is not configured".to_string()));
    }

    match state.predictor.health().await {
        Ok(remote) if remote.is_healthy() => Ok(Json(PredictorHealth { status: "healthy", remote })),
        Ok(remote) => {
            tracing::warn!("ML predictor unhealthy: status={} model_loaded={}", remote.status, remote.model_loaded);
            Err(AppError::ServiceUnavailable("ML predictor is unhealthy".to_string()))
        }
        Err(err) => {
            tracing::warn!("ML predictor health check failed: {}", err);
            Err(AppError::ServiceUnavailable("ML predictor is unavailable".to_string()))
        }
    }
}
