use sqlx::PgExecutor;
use time::PrimitiveDateTime;

use crate::db::models::User;
use crate::db::types::UserRole;

const COLUMNS: &str = "\
    user_id, username, password, full_name, email, phone, gender, role_id, \
    is_active, force_password_change, created_at";

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    user_id: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE user_id = $1"))
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

/// Case-insensitive lookup.
pub(crate) async fn find_by_username(
    executor: impl PgExecutor<'_>,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE LOWER(username) = LOWER($1)"
    ))
    .bind(username)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn username_taken(
    executor: impl PgExecutor<'_>,
    username: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))")
        .bind(username)
        .fetch_one(executor)
        .await
}

pub(crate) async fn list_all(executor: impl PgExecutor<'_>) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users ORDER BY user_id"))
        .fetch_all(executor)
        .await
}

pub(crate) async fn count_by_role_id(
    executor: impl PgExecutor<'_>,
    role_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role_id = $1")
        .bind(role_id)
        .fetch_one(executor)
        .await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) username: &'a str,
    pub(crate) password_hash: &'a str,
    pub(crate) full_name: Option<&'a str>,
    pub(crate) email: Option<&'a str>,
    pub(crate) phone: Option<&'a str>,
    pub(crate) gender: Option<&'a str>,
    pub(crate) role: UserRole,
    pub(crate) force_password_change: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: CreateUser<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            username, password, full_name, email, phone, gender, role_id,
            is_active, force_password_change, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, $9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.username)
    .bind(params.password_hash)
    .bind(params.full_name)
    .bind(params.email)
    .bind(params.phone)
    .bind(params.gender)
    .bind(params.role.id())
    .bind(params.force_password_change)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

/// Blank fields keep their stored value.
pub(crate) struct UpdateProfile<'a> {
    pub(crate) full_name: Option<&'a str>,
    pub(crate) email: Option<&'a str>,
    pub(crate) phone: Option<&'a str>,
    pub(crate) gender: Option<&'a str>,
}

pub(crate) async fn update_profile(
    executor: impl PgExecutor<'_>,
    user_id: i64,
    params: UpdateProfile<'_>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET
            full_name = COALESCE($1, full_name),
            email = COALESCE($2, email),
            phone = COALESCE($3, phone),
            gender = COALESCE($4, gender)
         WHERE user_id = $5",
    )
    .bind(params.full_name)
    .bind(params.email)
    .bind(params.phone)
    .bind(params.gender)
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn set_password(
    executor: impl PgExecutor<'_>,
    user_id: i64,
    password_hash: &str,
    force_password_change: bool,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET password = $1, force_password_change = $2 WHERE user_id = $3",
    )
    .bind(password_hash)
    .bind(force_password_change)
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// Flips `is_active` and returns the new value, `None` when the user is missing.
pub(crate) async fn toggle_active(
    executor: impl PgExecutor<'_>,
    user_id: i64,
) -> Result<Option<bool>, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE users SET is_active = NOT is_active WHERE user_id = $1 RETURNING is_active",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn repair_superuser(
    executor: impl PgExecutor<'_>,
    user_id: i64,
    password_hash: Option<&str>,
    role: UserRole,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET
            password = COALESCE($1, password),
            role_id = $2,
            is_active = TRUE
         WHERE user_id = $3",
    )
    .bind(password_hash)
    .bind(role.id())
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(())
}
