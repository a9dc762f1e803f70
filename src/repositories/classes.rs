use sqlx::PgExecutor;

use crate::db::models::Class;

const COLUMNS: &str = "class_id, class_name, grade_level, academic_year, max_students, is_active";

pub(crate) struct ClassFields<'a> {
    pub(crate) class_name: &'a str,
    pub(crate) grade_level: &'a str,
    pub(crate) academic_year: &'a str,
    pub(crate) max_students: Option<i32>,
}

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    class_id: i64,
) -> Result<Option<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!("SELECT {COLUMNS} FROM classes WHERE class_id = $1"))
        .bind(class_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_by_grade_and_name(
    executor: impl PgExecutor<'_>,
    grade_level: &str,
    class_name: &str,
) -> Result<Option<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!(
        "SELECT {COLUMNS} FROM classes
         WHERE grade_level = $1 AND class_name = $2
         ORDER BY is_active DESC, class_id DESC
         LIMIT 1"
    ))
    .bind(grade_level)
    .bind(class_name)
    .fetch_optional(executor)
    .await
}

/// Newest first; `active` narrows to active or inactive rows.
pub(crate) async fn list_page(
    executor: impl PgExecutor<'_>,
    active: Option<bool>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!(
        "SELECT {COLUMNS} FROM classes
         WHERE ($1::BOOLEAN IS NULL OR is_active = $1)
         ORDER BY class_id DESC
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
    sqlx::query_scalar("SELECT COUNT(*) FROM classes WHERE ($1::BOOLEAN IS NULL OR is_active = $1)")
        .bind(active)
        .fetch_one(executor)
        .await
}

pub(crate) async fn list_active(executor: impl PgExecutor<'_>) -> Result<Vec<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!(
        "SELECT {COLUMNS} FROM classes WHERE is_active ORDER BY grade_level, class_name"
    ))
    .fetch_all(executor)
    .await
}

/// Active classes with room left; a NULL capacity means unlimited.
pub(crate) async fn list_available(
    executor: impl PgExecutor<'_>,
) -> Result<Vec<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(
        "SELECT c.class_id, c.class_name, c.grade_level, c.academic_year, c.max_students,
                c.is_active
         FROM classes c
         LEFT JOIN students s ON s.class_id = c.class_id
         WHERE c.is_active
         GROUP BY c.class_id
         HAVING c.max_students IS NULL OR COUNT(s.student_id) < c.max_students
         ORDER BY c.grade_level, c.class_name",
    )
    .fetch_all(executor)
    .await
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    fields: ClassFields<'_>,
) -> Result<Class, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!(
        "INSERT INTO classes (class_name, grade_level, academic_year, max_students, is_active)
         VALUES ($1, $2, $3, $4, TRUE)
         RETURNING {COLUMNS}"
    ))
    .bind(fields.class_name)
    .bind(fields.grade_level)
    .bind(fields.academic_year)
    .bind(fields.max_students)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update(
    executor: impl PgExecutor<'_>,
    class_id: i64,
    fields: ClassFields<'_>,
) -> Result<Option<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!(
        "UPDATE classes
         SET class_name = $1, grade_level = $2, academic_year = $3, max_students = $4
         WHERE class_id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(fields.class_name)
    .bind(fields.grade_level)
    .bind(fields.academic_year)
    .bind(fields.max_students)
    .bind(class_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn set_active(
    executor: impl PgExecutor<'_>,
    class_id: i64,
    is_active: bool,
) -> Result<Option<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!(
        "UPDATE classes SET is_active = $1 WHERE class_id = $2 RETURNING {COLUMNS}"
    ))
    .bind(is_active)
    .bind(class_id)
    .fetch_optional(executor)
    .await
}
