use sqlx::PgPool;

use crate::core::security;
use crate::db::models::User;
use crate::repositories;

/// `<first name lowercase>123@@`, using the username when no full name is set.
pub(crate) fn default_password(user: &User) -> String {
    let first = user.display_name().split_whitespace().next().unwrap_or(&user.username);
    format!("{}123@@", first.to_lowercase())
}

/// Resets every account to its default password and forces a change at next
/// login. All updates commit together.
pub(crate) async fn reset_all(pool: &PgPool) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    let users = repositories::users::list_all(&mut *tx).await?;

    for user in &users {
        let password_hash = security::hash_password(&default_password(user))?;
        repositories::users::set_password(&mut *tx, user.user_id, &password_hash, true).await?;
        tracing::info!(user_id = user.user_id, username = %user.username, "Password reset");
    }

    tx.commit().await?;
    Ok(users.len())
}
