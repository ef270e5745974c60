use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::AppJson,
    handlers::parse_uuid_param,
    middlewares::auth::{JwtClaims, OptionalClaims},
    models::attempt::SubmitAnswersRequest,
    services::{
        lesson_service::LessonService, profile_service::ProfileService,
        submission_service::SubmissionService, AppState,
    },
};

/// GET /lessons - List lessons, with the caller's progress when authenticated
pub async fn list_lessons(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<OptionalClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = claims.user_id();

    tracing::debug!(caller = ?caller, "Listing lessons");

    let service = LessonService::new(state.db.clone());
    let lessons = service.list_lessons(caller).await?;

    Ok(Json(json!({ "success": true, "data": lessons })))
}

/// GET /lessons/:id - Lesson detail with problems (no correct answers)
pub async fn get_lesson(
    State(state): State<Arc<AppState>>,
    Path(lesson_id): Path<String>,
    Extension(claims): Extension<OptionalClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let lesson_id = parse_uuid_param(&lesson_id, "lesson")?;
    let caller = claims.user_id();

    let service = LessonService::new(state.db.clone());
    let lesson = service.get_lesson(lesson_id, caller, true).await?;

    Ok(Json(json!({ "success": true, "data": lesson })))
}

/// POST /lessons/:id/submit - Idempotent answer submission (protected)
pub async fn submit_answers(
    State(state): State<Arc<AppState>>,
    Path(lesson_id): Path<String>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<SubmitAnswersRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let lesson_id = parse_uuid_param(&lesson_id, "lesson")?;
    req.validate()?;

    let user_id = claims.user_id()?;

    tracing::info!(
        %lesson_id,
        %user_id,
        attempt_id = %req.attempt_id,
        answers = req.answers.len(),
        "Processing lesson submission"
    );

    let service = SubmissionService::new(state.db.clone());
    let result = service.submit(lesson_id, user_id, &req).await?;

    Ok(Json(json!({ "success": true, "data": result })))
}

/// GET /lessons/:id/attempts - The caller's attempts for a lesson (protected)
pub async fn get_lesson_attempts(
    State(state): State<Arc<AppState>>,
    Path(lesson_id): Path<String>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let lesson_id = parse_uuid_param(&lesson_id, "lesson")?;
    let user_id = claims.user_id()?;

    let service = ProfileService::new(state.db.clone());
    let attempts = service.get_attempts(user_id, Some(lesson_id)).await?;

    Ok(Json(json!({ "success": true, "data": attempts })))
}

/// GET /lessons/:id/stats - Aggregate lesson statistics (public)
pub async fn get_lesson_stats(
    State(state): State<Arc<AppState>>,
    Path(lesson_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lesson_id = parse_uuid_param(&lesson_id, "lesson")?;

    let service = LessonService::new(state.db.clone());
    let stats = service.lesson_stats(lesson_id).await?;

    Ok(Json(json!({ "success": true, "data": stats })))
}
