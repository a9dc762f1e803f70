use sqlx::PgExecutor;

use crate::db::models::Role;

pub(crate) async fn list(executor: impl PgExecutor<'_>) -> Result<Vec<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>("SELECT role_id, role_name FROM roles ORDER BY role_id")
        .fetch_all(executor)
        .await
}

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    role_id: i64,
) -> Result<Option<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>("SELECT role_id, role_name FROM roles WHERE role_id = $1")
        .bind(role_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    role_name: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("INSERT INTO roles (role_name) VALUES ($1) RETURNING role_id")
        .bind(role_name)
        .fetch_one(executor)
        .await
}

pub(crate) async fn rename(
    executor: impl PgExecutor<'_>,
    role_id: i64,
    role_name: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE roles SET role_name = $1 WHERE role_id = $2")
        .bind(role_name)
        .bind(role_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete(
    executor: impl PgExecutor<'_>,
    role_id: i64,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM roles WHERE role_id = $1").bind(role_id).execute(executor).await?;
    Ok(result.rows_affected())
}
