//! Student handlers

use axum::{extract::{State, Path, Query}, http::StatusCode, Json};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, AppResult, AppError};
use crate::models::{CreateStudent, PredictionRecord, PredictionView, Student, StudentPage, StudentQuery, UpdateStudent};
use crate::middleware::auth::UserContext;

#[derive(Debug, Serialize)]
pub struct StudentDetail {
    #[serde(flatten)]
    pub student: Student,
    pub predictions: Vec<PredictionView>,
}

async fn find_owned(state: &AppState, user: &UserContext, id: Uuid) -> AppResult<Student> {
    Student::find_scoped(&state.pool, id, user.owner_scope())
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))
}

/// Create a student owned by the caller
pub async fn create(
    State(state): State<AppState>,
    user: UserContext,
    Json(req): Json<CreateStudent>,
) -> AppResult<(StatusCode, Json<Student>)> {
    req.validate()?;

    if Student::student_id_taken(&state.pool, &req.student_id, None).await? {
        return Err(AppError::AlreadyExists("Student ID already exists".to_string()));
    }

    let student = Student::create(&state.pool, user.user_id, req).await?;
    tracing::info!("Student created: {} ({})", student.student_id, student.id);

    Ok((StatusCode::CREATED, Json(student)))
}

/// List students visible to the caller
pub async fn list(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<StudentQuery>,
) -> AppResult<Json<StudentPage>> {
    let page = Student::list(&state.pool, user.owner_scope(), &query).await?;
    Ok(Json(page))
}

/// Get a student with its prediction history
pub async fn get(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StudentDetail>> {
    let student = find_owned(&state, &user, id).await?;

    let predictions = PredictionRecord::all_for_student(&state.pool, student.id)
        .await?
        .into_iter()
        .map(|p| p.into_view(None))
        .collect();

    Ok(Json(StudentDetail { student, predictions }))
}

/// Partially update a student
pub async fn update(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStudent>,
) -> AppResult<Json<Student>> {
    req.validate()?;

    let student = find_owned(&state, &user, id).await?;

    if let Some(student_id) = req.student_id.as_deref() {
        if student_id != student.student_id
            && Student::student_id_taken(&state.pool, student_id, Some(student.id)).await?
        {
            return Err(AppError::AlreadyExists("Student ID already exists".to_string()));
        }
    }

    let updated = Student::update(&state.pool, student.id, req).await?;
    tracing::info!("Student updated: {}", updated.id);

    Ok(Json(updated))
}

/// Delete a student and its predictions
pub async fn delete(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let student = find_owned(&state, &user, id).await?;

    if !Student::delete(&state.pool, student.id).await? {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    tracing::info!("Student deleted: {}", student.id);

    Ok(Json(serde_json::json!({ "deleted": true, "id": student.id })))
}
