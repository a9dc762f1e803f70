use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, Client, RedisError};
use tokio::sync::RwLock;

const TAKE_LIST_SCRIPT: &str = r#"
    local items = redis.call("LRANGE", KEYS[1], 0, -1)
    redis.call("DEL", KEYS[1])
    return items
"#;

const RATE_LIMIT_SCRIPT: &str = r#"
    local current = redis.call("INCR", KEYS[1])
    if current == 1 then
        redis.call("EXPIRE", KEYS[1], ARGV[1])
    end
    return current
"#;

/// Shared, lazily connected Redis client.
///
/// Every command helper returns `Ok(None)` while disconnected so callers can
/// fall back to in-process state.
#[derive(Clone)]
pub(crate) struct RedisHandle {
    url: String,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

#[derive(Debug, Clone)]
pub(crate) enum RedisHealth {
    Healthy,
    Disconnected,
    Unhealthy(String),
}

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, manager: Arc::new(RwLock::new(None)) }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        let client = Client::open(self.url.clone())?;
        let manager = ConnectionManager::new(client).await?;
        let mut guard = self.manager.write().await;
        *guard = Some(manager);
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        let mut guard = self.manager.write().await;
        *guard = None;
    }

    async fn manager(&self) -> Option<ConnectionManager> {
        self.manager.read().await.clone()
    }

    pub(crate) async fn health(&self) -> RedisHealth {
        let Some(mut manager) = self.manager().await else {
            return RedisHealth::Disconnected;
        };

        match cmd("PING").query_async::<_, String>(&mut manager).await {
            Ok(_) => RedisHealth::Healthy,
            Err(err) => RedisHealth::Unhealthy(err.to_string()),
        }
    }

    /// Fixed-window counter; allows everything while disconnected.
    pub(crate) async fn rate_limit(
        &self,
        key: &str,
        limit: u64,
        window_seconds: u64,
    ) -> Result<bool, RedisError> {
        let Some(mut manager) = self.manager().await else {
            return Ok(true);
        };

        let current: i64 = redis::Script::new(RATE_LIMIT_SCRIPT)
            .key(key)
            .arg(window_seconds as i64)
            .invoke_async(&mut manager)
            .await?;

        Ok(current <= limit as i64)
    }

    pub(crate) async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<Option<()>, RedisError> {
        let Some(mut manager) = self.manager().await else {
            return Ok(None);
        };

        cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds.max(1))
            .query_async::<_, ()>(&mut manager)
            .await?;
        Ok(Some(()))
    }

    pub(crate) async fn exists(&self, key: &str) -> Result<Option<bool>, RedisError> {
        let Some(mut manager) = self.manager().await else {
            return Ok(None);
        };

        let exists: bool = cmd("EXISTS").arg(key).query_async(&mut manager).await?;
        Ok(Some(exists))
    }

    /// Appends to a list and refreshes its expiry in one MULTI block.
    pub(crate) async fn push_list(
        &self,
        key: &str,
        values: &[String],
        ttl_seconds: u64,
    ) -> Result<Option<()>, RedisError> {
        let Some(mut manager) = self.manager().await else {
            return Ok(None);
        };

        if values.is_empty() {
            return Ok(Some(()));
        }

        redis::pipe()
            .atomic()
            .cmd("RPUSH")
            .arg(key)
            .arg(values)
            .ignore()
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl_seconds.max(1))
            .ignore()
            .query_async::<_, ()>(&mut manager)
            .await?;
        Ok(Some(()))
    }

    pub(crate) async fn list_len(&self, key: &str) -> Result<Option<u64>, RedisError> {
        let Some(mut manager) = self.manager().await else {
            return Ok(None);
        };

        let len: u64 = cmd("LLEN").arg(key).query_async(&mut manager).await?;
        Ok(Some(len))
    }

    /// Reads and deletes a list atomically.
    pub(crate) async fn take_list(&self, key: &str) -> Result<Option<Vec<String>>, RedisError> {
        let Some(mut manager) = self.manager().await else {
            return Ok(None);
        };

        let items: Vec<String> =
            redis::Script::new(TAKE_LIST_SCRIPT).key(key).invoke_async(&mut manager).await?;
        Ok(Some(items))
    }

    pub(crate) async fn delete(&self, key: &str) -> Result<Option<()>, RedisError> {
        let Some(mut manager) = self.manager().await else {
            return Ok(None);
        };

        cmd("DEL").arg(key).query_async::<_, ()>(&mut manager).await?;
        Ok(Some(()))
    }
}
