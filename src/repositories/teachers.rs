use sqlx::PgExecutor;

use crate::db::models::Teacher;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct TeacherListRow {
    pub(crate) teacher_id: i64,
    pub(crate) user_id: i64,
    pub(crate) username: String,
    pub(crate) full_name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) gender: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) subject_id: Option<i64>,
    pub(crate) subject_name: Option<String>,
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    user_id: i64,
    subject_id: Option<i64>,
) -> Result<Teacher, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(
        "INSERT INTO teachers (subject_id, users_user_id) VALUES ($1, $2)
         RETURNING teacher_id, subject_id, users_user_id",
    )
    .bind(subject_id)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_user_id(
    executor: impl PgExecutor<'_>,
    user_id: i64,
) -> Result<Option<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(
        "SELECT teacher_id, subject_id, users_user_id FROM teachers WHERE users_user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn set_subject(
    executor: impl PgExecutor<'_>,
    user_id: i64,
    subject_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE teachers SET subject_id = $1 WHERE users_user_id = $2")
        .bind(subject_id)
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn count(executor: impl PgExecutor<'_>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM teachers").fetch_one(executor).await
}

pub(crate) async fn list_page(
    executor: impl PgExecutor<'_>,
    limit: i64,
    offset: i64,
) -> Result<Vec<TeacherListRow>, sqlx::Error> {
    sqlx::query_as::<_, TeacherListRow>(
        "SELECT t.teacher_id, u.user_id, u.username, u.full_name, u.email, u.phone, u.gender,
                u.is_active, t.subject_id, sub.subject_name
         FROM teachers t
         JOIN users u ON u.user_id = t.users_user_id
         LEFT JOIN subjects sub ON sub.subject_id = t.subject_id
         ORDER BY t.teacher_id DESC
         LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}
