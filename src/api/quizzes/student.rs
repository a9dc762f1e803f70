use std::collections::HashSet;

use axum::{extract::State, Json};
use sqlx::PgConnection;

use crate::api::errors::ApiError;
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::guards::CurrentStudent;
use crate::core::{metrics, state::AppState, time::primitive_now_utc};
use crate::db::models::{Quiz, Student};
use crate::repositories;
use crate::schemas::quiz::{
    QuizDetailResponse, QuizSubmission, QuizSubmitResponse, QuizSummaryResponse,
    StudentQuizResponse,
};
use crate::services::{grading, quiz_window};

use super::helpers::{quiz_detail, quiz_not_found};

fn already_submitted() -> ApiError {
    ApiError::Conflict("Quiz already submitted.".to_string())
}

async fn student_profile(
    conn: &mut PgConnection,
    user_id: i64,
) -> Result<Option<Student>, ApiError> {
    repositories::students::find_by_user_id(&mut *conn, user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))
}

/// Active quiz assigned to the student's class; anything else is reported as missing.
async fn load_assigned_quiz(
    conn: &mut PgConnection,
    user_id: i64,
    quiz_id: i64,
) -> Result<(Student, Quiz), ApiError> {
    let student = student_profile(conn, user_id).await?.ok_or_else(quiz_not_found)?;
    let quiz = repositories::quizzes::find_by_id(&mut *conn, quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load quiz"))?
        .filter(|quiz| quiz.is_active && student.class_id == Some(quiz.class_id))
        .ok_or_else(quiz_not_found)?;
    Ok((student, quiz))
}

async fn ensure_not_submitted(
    conn: &mut PgConnection,
    quiz_id: i64,
    student_id: i64,
) -> Result<(), ApiError> {
    let submitted = repositories::quiz_results::exists(&mut *conn, quiz_id, student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check submission"))?;
    if submitted {
        return Err(already_submitted());
    }
    Ok(())
}

pub(super) async fn list_quizzes(
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentQuizResponse>>, ApiError> {
    let mut conn = state
        .db()
        .acquire()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to acquire connection"))?;
    let Some(student) = student_profile(&mut conn, user.user_id).await? else {
        return Ok(Json(Vec::new()));
    };
    let Some(class_id) = student.class_id else {
        return Ok(Json(Vec::new()));
    };

    let rows = repositories::quizzes::list_active_for_class(&mut *conn, class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list quizzes"))?;
    let submitted: HashSet<i64> =
        repositories::quiz_results::submitted_quiz_ids(&mut *conn, student.student_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load submissions"))?
            .into_iter()
            .collect();

    let now = primitive_now_utc();
    Ok(Json(
        rows.into_iter()
            .map(|row| {
                let status = quiz_window::status(row.start_time, row.end_time, now);
                StudentQuizResponse {
                    submitted: submitted.contains(&row.quiz_id),
                    quiz: QuizSummaryResponse::from_row(row, status),
                }
            })
            .collect(),
    ))
}

/// Questions without answers, only while the quiz is live and not yet submitted.
pub(super) async fn open_quiz(
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    ApiPath(quiz_id): ApiPath<i64>,
) -> Result<Json<QuizDetailResponse>, ApiError> {
    let mut conn = state
        .db()
        .acquire()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to acquire connection"))?;
    let (student, quiz) = load_assigned_quiz(&mut conn, user.user_id, quiz_id).await?;

    quiz_window::ensure_open(quiz.start_time, quiz.end_time, primitive_now_utc())
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;
    ensure_not_submitted(&mut conn, quiz.quiz_id, student.student_id).await?;

    Ok(Json(quiz_detail(&mut conn, quiz.quiz_id, false).await?))
}

pub(super) async fn submit_quiz(
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    ApiPath(quiz_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<QuizSubmission>,
) -> Result<Json<QuizSubmitResponse>, ApiError> {
    let now = primitive_now_utc();
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let (student, quiz) = load_assigned_quiz(&mut tx, user.user_id, quiz_id).await?;

    quiz_window::ensure_accepting_submissions(quiz.start_time, quiz.end_time, now)
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;
    ensure_not_submitted(&mut tx, quiz.quiz_id, student.student_id).await?;

    let questions = repositories::questions::list_by_quiz(&mut *tx, quiz.quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;
    let outcome = grading::grade_answers(&questions, &payload.answers);

    repositories::quiz_results::create(
        &mut *tx,
        repositories::quiz_results::NewQuizResult {
            quiz_id: quiz.quiz_id,
            student_id: student.student_id,
            score: outcome.score,
            total_questions: outcome.total,
            percentage: outcome.percentage,
            grade: outcome.grade,
            answers: grading::sanitize_answers(&questions, &payload.answers),
            submitted_at: now,
        },
    )
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            already_submitted()
        } else {
            ApiError::internal(e, "Failed to save result")
        }
    })?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    metrics::record_quiz_submission(outcome.grade);
    tracing::info!(
        quiz_id = quiz.quiz_id,
        student_id = student.student_id,
        score = outcome.score,
        total = outcome.total,
        "Quiz submitted"
    );

    Ok(Json(QuizSubmitResponse {
        ok: true,
        message: "Quiz submitted.",
        score: outcome.score,
        total: outcome.total,
        percentage: outcome.percentage,
        grade: outcome.grade,
    }))
}
