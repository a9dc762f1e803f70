use sqlx::PgExecutor;
use time::PrimitiveDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ActivityRow {
    pub(crate) log_id: i64,
    pub(crate) user_id: Option<i64>,
    pub(crate) username: Option<String>,
    pub(crate) action: String,
    pub(crate) details: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn record(
    executor: impl PgExecutor<'_>,
    user_id: Option<i64>,
    action: &str,
    details: Option<&str>,
    created_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO activity_logs (user_id, action, details, created_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(user_id)
    .bind(action)
    .bind(details)
    .bind(created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn count(executor: impl PgExecutor<'_>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs").fetch_one(executor).await
}

/// Newest first.
pub(crate) async fn list_page(
    executor: impl PgExecutor<'_>,
    limit: i64,
    offset: i64,
) -> Result<Vec<ActivityRow>, sqlx::Error> {
    sqlx::query_as::<_, ActivityRow>(
        "SELECT l.log_id, l.user_id, u.username, l.action, l.details, l.created_at
         FROM activity_logs l
         LEFT JOIN users u ON u.user_id = l.user_id
         ORDER BY l.created_at DESC, l.log_id DESC
         LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}
