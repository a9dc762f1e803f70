use sqlx::PgExecutor;

use crate::db::models::Subject;

const COLUMNS: &str = "subject_id, subject_name, description, is_active";

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    subject_id: i64,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!("SELECT {COLUMNS} FROM subjects WHERE subject_id = $1"))
        .bind(subject_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_page(
    executor: impl PgExecutor<'_>,
    active: Option<bool>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {COLUMNS} FROM subjects
         WHERE ($1::BOOLEAN IS NULL OR is_active = $1)
         ORDER BY subject_id DESC
         LIMIT $2 OFFSET $3"
    ))
    .bind(active)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

pub(crate) async fn count(
    executor: impl PgExecutor<'_>,
    active: Option<bool>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM subjects WHERE ($1::BOOLEAN IS NULL OR is_active = $1)",
    )
    .bind(active)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_active(
    executor: impl PgExecutor<'_>,
) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {COLUMNS} FROM subjects WHERE is_active ORDER BY subject_name"
    ))
    .fetch_all(executor)
    .await
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    subject_name: &str,
    description: Option<&str>,
) -> Result<Subject, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "INSERT INTO subjects (subject_name, description, is_active)
         VALUES ($1, $2, TRUE)
         RETURNING {COLUMNS}"
    ))
    .bind(subject_name)
    .bind(description)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update(
    executor: impl PgExecutor<'_>,
    subject_id: i64,
    subject_name: &str,
    description: Option<&str>,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "UPDATE subjects SET subject_name = $1, description = $2
         WHERE subject_id = $3
         RETURNING {COLUMNS}"
    ))
    .bind(subject_name)
    .bind(description)
    .bind(subject_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn set_active(
    executor: impl PgExecutor<'_>,
    subject_id: i64,
    is_active: bool,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "UPDATE subjects SET is_active = $1 WHERE subject_id = $2 RETURNING {COLUMNS}"
    ))
    .bind(is_active)
    .bind(subject_id)
    .fetch_optional(executor)
    .await
}
