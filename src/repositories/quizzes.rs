use sqlx::PgExecutor;
use time::PrimitiveDateTime;

use crate::db::models::Quiz;

const COLUMNS: &str = "\
    quiz_id, title, description, class_id, subject_id, created_by, start_time, end_time, \
    duration_minutes, is_active, created_at, updated_at";

/// Quiz with display names and counters for list screens.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct QuizSummaryRow {
    pub(crate) quiz_id: i64,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) class_id: i64,
    pub(crate) class_name: String,
    pub(crate) subject_id: i64,
    pub(crate) subject_name: String,
    pub(crate) created_by: i64,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: PrimitiveDateTime,
    pub(crate) duration_minutes: i32,
    pub(crate) is_active: bool,
    pub(crate) question_count: i64,
    pub(crate) result_count: i64,
}

const SUMMARY_SELECT: &str = "\
    SELECT q.quiz_id, q.title, q.description, q.class_id, c.class_name, q.subject_id, \
           sub.subject_name, q.created_by, q.start_time, q.end_time, q.duration_minutes, \
           q.is_active, \
           (SELECT COUNT(*) FROM quiz_questions qq WHERE qq.quiz_id = q.quiz_id) AS question_count, \
           (SELECT COUNT(*) FROM quiz_results qr WHERE qr.quiz_id = q.quiz_id) AS result_count \
    FROM quizzes q \
    JOIN classes c ON c.class_id = q.class_id \
    JOIN subjects sub ON sub.subject_id = q.subject_id";

pub(crate) struct QuizFields<'a> {
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) class_id: i64,
    pub(crate) subject_id: i64,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: PrimitiveDateTime,
    pub(crate) duration_minutes: i32,
}

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    quiz_id: i64,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes WHERE quiz_id = $1"))
        .bind(quiz_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_summary(
    executor: impl PgExecutor<'_>,
    quiz_id: i64,
) -> Result<Option<QuizSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, QuizSummaryRow>(&format!("{SUMMARY_SELECT} WHERE q.quiz_id = $1"))
        .bind(quiz_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    fields: QuizFields<'_>,
    created_by: i64,
    now: PrimitiveDateTime,
) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "INSERT INTO quizzes (
            title, description, class_id, subject_id, created_by, start_time, end_time,
            duration_minutes, is_active, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9, $9)
        RETURNING {COLUMNS}"
    ))
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.class_id)
    .bind(fields.subject_id)
    .bind(created_by)
    .bind(fields.start_time)
    .bind(fields.end_time)
    .bind(fields.duration_minutes)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update(
    executor: impl PgExecutor<'_>,
    quiz_id: i64,
    fields: QuizFields<'_>,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE quizzes SET
            title = $1, description = $2, class_id = $3, subject_id = $4,
            start_time = $5, end_time = $6, duration_minutes = $7, updated_at = $8
         WHERE quiz_id = $9",
    )
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.class_id)
    .bind(fields.subject_id)
    .bind(fields.start_time)
    .bind(fields.end_time)
    .bind(fields.duration_minutes)
    .bind(now)
    .bind(quiz_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn toggle_active(
    executor: impl PgExecutor<'_>,
    quiz_id: i64,
    now: PrimitiveDateTime,
) -> Result<Option<bool>, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE quizzes SET is_active = NOT is_active, updated_at = $1
         WHERE quiz_id = $2
         RETURNING is_active",
    )
    .bind(now)
    .bind(quiz_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count(executor: impl PgExecutor<'_>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM quizzes").fetch_one(executor).await
}

pub(crate) async fn count_by_creator(
    executor: impl PgExecutor<'_>,
    created_by: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM quizzes WHERE created_by = $1")
        .bind(created_by)
        .fetch_one(executor)
        .await
}

pub(crate) async fn list_page_by_creator(
    executor: impl PgExecutor<'_>,
    created_by: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<QuizSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, QuizSummaryRow>(&format!(
        "{SUMMARY_SELECT}
         WHERE q.created_by = $1
         ORDER BY q.start_time DESC, q.quiz_id DESC
         LIMIT $2 OFFSET $3"
    ))
    .bind(created_by)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_windows_by_creator(
    executor: impl PgExecutor<'_>,
    created_by: i64,
) -> Result<Vec<(PrimitiveDateTime, PrimitiveDateTime)>, sqlx::Error> {
    sqlx::query_as("SELECT start_time, end_time FROM quizzes WHERE created_by = $1")
        .bind(created_by)
        .fetch_all(executor)
        .await
}

/// Active quizzes assigned to a class, soonest first.
pub(crate) async fn list_active_for_class(
    executor: impl PgExecutor<'_>,
    class_id: i64,
) -> Result<Vec<QuizSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, QuizSummaryRow>(&format!(
        "{SUMMARY_SELECT}
         WHERE q.class_id = $1 AND q.is_active
         ORDER BY q.start_time, q.quiz_id"
    ))
    .bind(class_id)
    .fetch_all(executor)
    .await
}
