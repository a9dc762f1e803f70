use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle, sessions::SessionStore};

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    sessions: SessionStore,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, redis: RedisHandle) -> Self {
        let credentials_ttl =
            Duration::from_secs(settings.accounts().credentials_ttl_minutes.saturating_mul(60));
        let sessions = SessionStore::new(redis.clone(), credentials_ttl);
        Self { inner: Arc::new(InnerState { settings, db, redis, sessions }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }
}
