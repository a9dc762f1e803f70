pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};

/// Loads `.env` and settings, starts logging and opens a migrated pool.
async fn start(binary: &'static str) -> anyhow::Result<(Settings, PgPool)> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    tracing::debug!(binary, environment = settings.runtime().environment.as_str(), "Starting");

    let pool = db::init_pool(&settings).await?;
    db::run_migrations(&pool).await?;
    Ok((settings, pool))
}

pub async fn run() -> anyhow::Result<()> {
    let (settings, pool) = start("school-lms").await?;
    crate::core::metrics::init(&settings)?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    match redis.connect().await {
        Ok(()) => tracing::info!("Redis connected"),
        Err(err) => tracing::error!(
            error = %err,
            "Redis unavailable; sessions and credentials stay in process memory"
        ),
    }

    let state = AppState::new(settings, pool, redis.clone());
    if let Err(err) = crate::core::bootstrap::ensure_superuser(&state).await {
        tracing::error!(error = %err, "Failed to ensure default superuser");
    }

    let settings = state.settings();
    let listener = tokio::net::TcpListener::bind(settings.server_addr()).await?;
    tracing::info!(
        host = %settings.server_host(),
        port = settings.server_port(),
        environment = settings.runtime().environment.as_str(),
        "School LMS API listening"
    );

    let served = axum::serve(listener, api::router::router(state.clone()))
        .with_graceful_shutdown(crate::core::shutdown::shutdown_signal())
        .await;

    redis.disconnect().await;
    served?;
    Ok(())
}

/// Entry point of the `reset-passwords` maintenance binary.
pub async fn run_password_reset() -> anyhow::Result<()> {
    let (_settings, pool) = start("reset-passwords").await?;

    let updated = services::password_reset::reset_all(&pool).await?;
    pool.close().await;

    println!("Completed! Updated {updated} user passwords.");
    Ok(())
}
