// src/handlers/session.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError, exam::ProgressEngine, models::session::SubmitAnswerRequest,
    utils::jwt::Claims,
};

/// Lists the status of every module slot in the assignment's group.
///
/// Statuses are computed fresh on every call; clients re-fetch after any mutation.
pub async fn list_module_statuses(
    State(engine): State<Arc<ProgressEngine>>,
    Extension(claims): Extension<Claims>,
    Path(assignment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam_taker_id = claims.exam_taker_id()?;
    let statuses = engine.module_statuses(exam_taker_id, assignment_id).await?;

    Ok(Json(statuses))
}

/// Starts a module attempt for the slot.
pub async fn start_module(
    State(engine): State<Arc<ProgressEngine>>,
    Extension(claims): Extension<Claims>,
    Path((assignment_id, slot_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let exam_taker_id = claims.exam_taker_id()?;
    let progress = engine
        .create_progress(exam_taker_id, assignment_id, slot_id)
        .await?;

    Ok((StatusCode::CREATED, Json(progress)))
}

/// Returns the randomized module content of a started attempt.
pub async fn get_module_content(
    State(engine): State<Arc<ProgressEngine>>,
    Extension(claims): Extension<Claims>,
    Path((assignment_id, version_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let exam_taker_id = claims.exam_taker_id()?;
    let content = engine
        .module_content(exam_taker_id, assignment_id, version_id)
        .await?;

    Ok(Json(content))
}

/// Records an answer to one question of a running attempt.
pub async fn submit_answer(
    State(engine): State<Arc<ProgressEngine>>,
    Extension(claims): Extension<Claims>,
    Path(progress_id): Path<i64>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exam_taker_id = claims.exam_taker_id()?;
    let response = engine
        .submit_answer(exam_taker_id, progress_id, &payload)
        .await?;

    Ok(Json(response))
}

/// Completes a running attempt.
pub async fn complete_module(
    State(engine): State<Arc<ProgressEngine>>,
    Extension(claims): Extension<Claims>,
    Path(progress_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam_taker_id = claims.exam_taker_id()?;
    let summary = engine.complete(exam_taker_id, progress_id).await?;

    Ok(Json(summary))
}
