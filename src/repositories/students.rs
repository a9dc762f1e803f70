use sqlx::PgExecutor;

use crate::db::models::Student;

/// Student joined with their account and class, as shown in admin and teacher lists.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct StudentListRow {
    pub(crate) student_id: i64,
    pub(crate) user_id: i64,
    pub(crate) username: String,
    pub(crate) full_name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) gender: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) class_id: Option<i64>,
    pub(crate) class_name: Option<String>,
}

const LIST_SELECT: &str = "\
    SELECT s.student_id, u.user_id, u.username, u.full_name, u.email, u.phone, u.gender, \
           u.is_active, s.class_id, c.class_name \
    FROM students s \
    JOIN users u ON u.user_id = s.users_user_id \
    LEFT JOIN classes c ON c.class_id = s.class_id";

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    user_id: i64,
    class_id: Option<i64>,
) -> Result<Student, sqlx::Error> {
    sqlx::query_as::<_, Student>(
        "INSERT INTO students (class_id, users_user_id) VALUES ($1, $2)
         RETURNING student_id, class_id, users_user_id",
    )
    .bind(class_id)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_user_id(
    executor: impl PgExecutor<'_>,
    user_id: i64,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(
        "SELECT student_id, class_id, users_user_id FROM students WHERE users_user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    student_id: i64,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(
        "SELECT student_id, class_id, users_user_id FROM students WHERE student_id = $1",
    )
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn set_class(
    executor: impl PgExecutor<'_>,
    user_id: i64,
    class_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE students SET class_id = $1 WHERE users_user_id = $2")
        .bind(class_id)
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn count(executor: impl PgExecutor<'_>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM students").fetch_one(executor).await
}

pub(crate) async fn count_in_class(
    executor: impl PgExecutor<'_>,
    class_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE class_id = $1")
        .bind(class_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn list_page(
    executor: impl PgExecutor<'_>,
    limit: i64,
    offset: i64,
) -> Result<Vec<StudentListRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentListRow>(&format!(
        "{LIST_SELECT} ORDER BY s.student_id DESC LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

/// Active accounts only, optionally narrowed to one class.
pub(crate) async fn list_active(
    executor: impl PgExecutor<'_>,
    class_id: Option<i64>,
) -> Result<Vec<StudentListRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentListRow>(&format!(
        "{LIST_SELECT}
         WHERE u.is_active AND ($1::BIGINT IS NULL OR s.class_id = $1)
         ORDER BY c.class_name NULLS LAST, u.full_name, u.username"
    ))
    .bind(class_id)
    .fetch_all(executor)
    .await
}
