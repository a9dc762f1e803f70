use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::api::activity;
use crate::api::errors::ApiError;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::guards::CurrentStaff;
use crate::api::pagination::{PageParams, Paginated};
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::repositories;
use crate::schemas::quiz::{
    non_blank, QuizCreate, QuizDetailResponse, QuizResultResponse, QuizSummaryResponse,
    QuizToggleResponse, QuizUpdate,
};
use crate::services::quiz_window;

use super::helpers::{
    correct_letters, ensure_class_and_subject, ensure_window, insert_questions, load_managed_quiz,
    quiz_detail, quiz_not_found,
};

pub(super) async fn list_quizzes(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Paginated<QuizSummaryResponse>>, ApiError> {
    let total = repositories::quizzes::count_by_creator(state.db(), user.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count quizzes"))?;
    let rows = repositories::quizzes::list_page_by_creator(
        state.db(),
        user.user_id,
        params.limit(),
        params.offset(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list quizzes"))?;

    let now = primitive_now_utc();
    Ok(Json(Paginated::new(rows, &params, total).map(|row| {
        let status = quiz_window::status(row.start_time, row.end_time, now);
        QuizSummaryResponse::from_row(row, status)
    })))
}

pub(super) async fn create_quiz(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<QuizCreate>,
) -> Result<(StatusCode, Json<QuizDetailResponse>), ApiError> {
    payload.validate().map_err(ApiError::InvalidFields)?;
    let start_time = to_primitive_utc(payload.start_time);
    let end_time = to_primitive_utc(payload.end_time);
    ensure_window(start_time, end_time)?;
    let letters = correct_letters(&payload.questions)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    ensure_class_and_subject(&mut tx, payload.class_id, payload.subject_id).await?;

    let description = non_blank(payload.description.as_deref());
    let quiz = repositories::quizzes::create(
        &mut *tx,
        repositories::quizzes::QuizFields {
            title: payload.title.trim(),
            description,
            class_id: payload.class_id,
            subject_id: payload.subject_id,
            start_time,
            end_time,
            duration_minutes: payload.duration_minutes,
        },
        user.user_id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create quiz"))?;
    insert_questions(&mut tx, quiz.quiz_id, &payload.questions, &letters).await?;
    activity::record(
        &mut tx,
        user.user_id,
        "create_quiz",
        Some(format!("quiz {} ({})", quiz.title, quiz.quiz_id)),
    )
    .await?;
    let detail = quiz_detail(&mut tx, quiz.quiz_id, true).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        quiz_id = quiz.quiz_id,
        questions = letters.len(),
        action = "create_quiz",
        "Quiz created"
    );
    Ok((StatusCode::CREATED, Json(detail)))
}

pub(super) async fn get_quiz(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    ApiPath(quiz_id): ApiPath<i64>,
) -> Result<Json<QuizDetailResponse>, ApiError> {
    let mut conn = state
        .db()
        .acquire()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to acquire connection"))?;
    load_managed_quiz(&mut conn, &user, quiz_id).await?;
    Ok(Json(quiz_detail(&mut conn, quiz_id, true).await?))
}

/// Absent fields keep their stored values; `questions`, when given, replaces the set.
pub(super) async fn update_quiz(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    ApiPath(quiz_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<QuizUpdate>,
) -> Result<Json<QuizDetailResponse>, ApiError> {
    payload.validate().map_err(ApiError::InvalidFields)?;
    let letters = payload.questions.as_deref().map(correct_letters).transpose()?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let quiz = load_managed_quiz(&mut tx, &user, quiz_id).await?;

    let start_time = payload.start_time.map(to_primitive_utc).unwrap_or(quiz.start_time);
    let end_time = payload.end_time.map(to_primitive_utc).unwrap_or(quiz.end_time);
    ensure_window(start_time, end_time)?;

    let class_id = payload.class_id.unwrap_or(quiz.class_id);
    let subject_id = payload.subject_id.unwrap_or(quiz.subject_id);
    ensure_class_and_subject(&mut tx, class_id, subject_id).await?;

    let title = payload.title.as_deref().map(str::trim).unwrap_or(&quiz.title);
    let description = match payload.description.as_deref() {
        Some(raw) => non_blank(Some(raw)),
        None => quiz.description.as_deref(),
    };

    repositories::quizzes::update(
        &mut *tx,
        quiz_id,
        repositories::quizzes::QuizFields {
            title,
            description,
            class_id,
            subject_id,
            start_time,
            end_time,
            duration_minutes: payload.duration_minutes.unwrap_or(quiz.duration_minutes),
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update quiz"))?;

    if let (Some(questions), Some(letters)) = (payload.questions.as_deref(), letters.as_deref()) {
        let results = repositories::quiz_results::count_by_quiz(&mut *tx, quiz_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count results"))?;
        if results > 0 {
            return Err(ApiError::Conflict(
                "Questions cannot be changed after students have submitted.".to_string(),
            ));
        }

        repositories::questions::delete_by_quiz(&mut *tx, quiz_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to replace questions"))?;
        insert_questions(&mut tx, quiz_id, questions, letters).await?;
    }

    activity::record(&mut tx, user.user_id, "update_quiz", Some(format!("quiz {quiz_id}"))).await?;
    let detail = quiz_detail(&mut tx, quiz_id, true).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(detail))
}

pub(super) async fn toggle_quiz(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    ApiPath(quiz_id): ApiPath<i64>,
) -> Result<Json<QuizToggleResponse>, ApiError> {
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    load_managed_quiz(&mut tx, &user, quiz_id).await?;

    let is_active = repositories::quizzes::toggle_active(&mut *tx, quiz_id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update quiz status"))?
        .ok_or_else(quiz_not_found)?;
    let action = if is_active { "activate_quiz" } else { "deactivate_quiz" };
    activity::record(&mut tx, user.user_id, action, Some(format!("quiz {quiz_id}"))).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(QuizToggleResponse { ok: true, quiz_id, is_active }))
}

pub(super) async fn quiz_results(
    CurrentStaff(user): CurrentStaff,
    State(state): State<AppState>,
    ApiPath(quiz_id): ApiPath<i64>,
) -> Result<Json<Vec<QuizResultResponse>>, ApiError> {
    let mut conn = state
        .db()
        .acquire()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to acquire connection"))?;
    load_managed_quiz(&mut conn, &user, quiz_id).await?;

    let rows = repositories::quiz_results::list_by_quiz(&mut *conn, quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list results"))?;
    Ok(Json(rows.into_iter().map(QuizResultResponse::from).collect()))
}
