use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

/// Creates the configured admin account, or repairs its password, role and
/// active flag when it already exists.
pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping superuser creation");
        return Ok(());
    }

    let username = admin.first_superuser_username.trim();
    let existing = repositories::users::find_by_username(state.db(), username).await?;

    let Some(user) = existing else {
        let hashed_password = security::hash_password(&admin.first_superuser_password)?;
        let user = repositories::users::create(
            state.db(),
            repositories::users::CreateUser {
                username,
                password_hash: &hashed_password,
                full_name: Some("Administrator"),
                email: None,
                phone: None,
                gender: None,
                role: UserRole::Admin,
                force_password_change: false,
                created_at: primitive_now_utc(),
            },
        )
        .await?;

        tracing::info!(user_id = user.user_id, username, "Created default superuser");
        return Ok(());
    };

    let password_matches =
        security::verify_password(&admin.first_superuser_password, &user.password)
            .unwrap_or(false);
    let needs_update =
        !password_matches || user.role() != Some(UserRole::Admin) || !user.is_active;

    if !needs_update {
        tracing::info!(user_id = user.user_id, "Default superuser already up to date");
        return Ok(());
    }

    let password_hash = if password_matches {
        None
    } else {
        Some(security::hash_password(&admin.first_superuser_password)?)
    };

    repositories::users::repair_superuser(
        state.db(),
        user.user_id,
        password_hash.as_deref(),
        UserRole::Admin,
    )
    .await?;

    tracing::info!(user_id = user.user_id, username, "Updated default superuser");
    Ok(())
}
