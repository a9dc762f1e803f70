use std::collections::HashMap;

use sqlx::types::Json;
use sqlx::PgExecutor;
use time::PrimitiveDateTime;

use crate::db::models::QuizResult;

const COLUMNS: &str = "\
    result_id, quiz_id, student_id, score, total_questions, percentage, grade, answers, \
    submitted_at";

/// Result joined with the student's name, for teacher views.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct QuizResultRow {
    pub(crate) result_id: i64,
    pub(crate) quiz_id: i64,
    pub(crate) quiz_title: String,
    pub(crate) student_id: i64,
    pub(crate) student_name: String,
    pub(crate) class_name: Option<String>,
    pub(crate) score: i32,
    pub(crate) total_questions: i32,
    pub(crate) percentage: f64,
    pub(crate) grade: String,
    pub(crate) submitted_at: PrimitiveDateTime,
}

const ROW_SELECT: &str = "\
    SELECT qr.result_id, qr.quiz_id, q.title AS quiz_title, qr.student_id, \
           COALESCE(NULLIF(u.full_name, ''), u.username) AS student_name, c.class_name, \
           qr.score, qr.total_questions, qr.percentage, qr.grade, qr.submitted_at \
    FROM quiz_results qr \
    JOIN quizzes q ON q.quiz_id = qr.quiz_id \
    JOIN students s ON s.student_id = qr.student_id \
    JOIN users u ON u.user_id = s.users_user_id \
    LEFT JOIN classes c ON c.class_id = s.class_id";

pub(crate) struct NewQuizResult<'a> {
    pub(crate) quiz_id: i64,
    pub(crate) student_id: i64,
    pub(crate) score: i32,
    pub(crate) total_questions: i32,
    pub(crate) percentage: f64,
    pub(crate) grade: &'a str,
    pub(crate) answers: HashMap<String, String>,
    pub(crate) submitted_at: PrimitiveDateTime,
}

/// Fails with a unique violation when the student already has a result for the quiz.
pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: NewQuizResult<'_>,
) -> Result<QuizResult, sqlx::Error> {
    sqlx::query_as::<_, QuizResult>(&format!(
        "INSERT INTO quiz_results (
            quiz_id, student_id, score, total_questions, percentage, grade, answers, submitted_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {COLUMNS}"
    ))
    .bind(params.quiz_id)
    .bind(params.student_id)
    .bind(params.score)
    .bind(params.total_questions)
    .bind(params.percentage)
    .bind(params.grade)
    .bind(Json(params.answers))
    .bind(params.submitted_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn exists(
    executor: impl PgExecutor<'_>,
    quiz_id: i64,
    student_id: i64,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM quiz_results WHERE quiz_id = $1 AND student_id = $2)",
    )
    .bind(quiz_id)
    .bind(student_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn submitted_quiz_ids(
    executor: impl PgExecutor<'_>,
    student_id: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT quiz_id FROM quiz_results WHERE student_id = $1")
        .bind(student_id)
        .fetch_all(executor)
        .await
}

pub(crate) async fn count_by_quiz(
    executor: impl PgExecutor<'_>,
    quiz_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM quiz_results WHERE quiz_id = $1")
        .bind(quiz_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn count(executor: impl PgExecutor<'_>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM quiz_results").fetch_one(executor).await
}

pub(crate) async fn list_by_quiz(
    executor: impl PgExecutor<'_>,
    quiz_id: i64,
) -> Result<Vec<QuizResultRow>, sqlx::Error> {
    sqlx::query_as::<_, QuizResultRow>(&format!(
        "{ROW_SELECT} WHERE qr.quiz_id = $1 ORDER BY qr.percentage DESC, qr.submitted_at"
    ))
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

/// Latest results across the quizzes a teacher created.
pub(crate) async fn list_recent_by_creator(
    executor: impl PgExecutor<'_>,
    created_by: i64,
    limit: i64,
) -> Result<Vec<QuizResultRow>, sqlx::Error> {
    sqlx::query_as::<_, QuizResultRow>(&format!(
        "{ROW_SELECT} WHERE q.created_by = $1 ORDER BY qr.submitted_at DESC LIMIT $2"
    ))
    .bind(created_by)
    .bind(limit)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_recent_by_student(
    executor: impl PgExecutor<'_>,
    student_id: i64,
    limit: i64,
) -> Result<Vec<QuizResultRow>, sqlx::Error> {
    sqlx::query_as::<_, QuizResultRow>(&format!(
        "{ROW_SELECT} WHERE qr.student_id = $1 ORDER BY qr.submitted_at DESC LIMIT $2"
    ))
    .bind(student_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}

pub(crate) async fn count_distinct_students_by_creator(
    executor: impl PgExecutor<'_>,
    created_by: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(DISTINCT qr.student_id)
         FROM quiz_results qr
         JOIN quizzes q ON q.quiz_id = qr.quiz_id
         WHERE q.created_by = $1",
    )
    .bind(created_by)
    .fetch_one(executor)
    .await
}

pub(crate) async fn average_for_student(
    executor: impl PgExecutor<'_>,
    student_id: i64,
) -> Result<Option<f64>, sqlx::Error> {
    sqlx::query_scalar("SELECT AVG(percentage) FROM quiz_results WHERE student_id = $1")
        .bind(student_id)
        .fetch_one(executor)
        .await
}
