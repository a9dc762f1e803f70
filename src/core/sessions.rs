use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::core::redis::RedisHandle;
use crate::services::credentials::IssuedCredential;

const REVOKED_PREFIX: &str = "lms:revoked:";
const CREDENTIALS_PREFIX: &str = "lms:credentials:";

/// Per-login state keyed by the token's session id: revocation markers and the
/// one-time credential list. Backed by Redis, with an in-process map while
/// Redis is unavailable.
#[derive(Clone)]
pub(crate) struct SessionStore {
    redis: RedisHandle,
    credentials_ttl: Duration,
    fallback: Arc<Mutex<FallbackSessions>>,
}

#[derive(Default)]
struct FallbackSessions {
    revoked: HashMap<String, Instant>,
    credentials: HashMap<String, (Instant, Vec<IssuedCredential>)>,
}

impl FallbackSessions {
    fn prune(&mut self, now: Instant) {
        self.revoked.retain(|_, expires_at| *expires_at > now);
        self.credentials.retain(|_, (expires_at, _)| *expires_at > now);
    }
}

impl SessionStore {
    pub(crate) fn new(redis: RedisHandle, credentials_ttl: Duration) -> Self {
        Self { redis, credentials_ttl, fallback: Arc::new(Mutex::new(FallbackSessions::default())) }
    }

    /// Marks a session as logged out until its token would have expired anyway.
    pub(crate) async fn revoke(&self, session_id: &str, ttl: Duration) {
        let key = format!("{REVOKED_PREFIX}{session_id}");
        match self.redis.set_with_ttl(&key, "1", ttl.as_secs()).await {
            Ok(Some(())) => return,
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "Failed to store session revocation in Redis"),
        }

        let mut fallback = self.fallback.lock().await;
        fallback.revoked.insert(session_id.to_string(), Instant::now() + ttl);
    }

    pub(crate) async fn is_revoked(&self, session_id: &str) -> bool {
        let key = format!("{REVOKED_PREFIX}{session_id}");
        let in_redis = match self.redis.exists(&key).await {
            Ok(found) => found.unwrap_or(false),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to check session revocation in Redis");
                false
            }
        };

        if in_redis {
            return true;
        }

        let mut fallback = self.fallback.lock().await;
        fallback.prune(Instant::now());
        fallback.revoked.contains_key(session_id)
    }

    pub(crate) async fn push_credentials(&self, session_id: &str, items: &[IssuedCredential]) {
        if items.is_empty() {
            return;
        }

        let key = format!("{CREDENTIALS_PREFIX}{session_id}");
        let encoded = items
            .iter()
            .filter_map(|item| serde_json::to_string(item).ok())
            .collect::<Vec<_>>();

        match self.redis.push_list(&key, &encoded, self.credentials_ttl.as_secs()).await {
            Ok(Some(())) => return,
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "Failed to store credentials in Redis"),
        }

        let mut fallback = self.fallback.lock().await;
        let expires_at = Instant::now() + self.credentials_ttl;
        let entry = fallback
            .credentials
            .entry(session_id.to_string())
            .or_insert_with(|| (expires_at, Vec::new()));
        entry.0 = expires_at;
        entry.1.extend_from_slice(items);
    }

    pub(crate) async fn has_credentials(&self, session_id: &str) -> bool {
        let key = format!("{CREDENTIALS_PREFIX}{session_id}");
        match self.redis.list_len(&key).await {
            Ok(Some(len)) if len > 0 => return true,
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "Failed to read credential count from Redis"),
        }

        let mut fallback = self.fallback.lock().await;
        fallback.prune(Instant::now());
        fallback.credentials.get(session_id).is_some_and(|(_, items)| !items.is_empty())
    }

    /// Returns the list and clears it in the same step.
    pub(crate) async fn take_credentials(&self, session_id: &str) -> Vec<IssuedCredential> {
        let key = format!("{CREDENTIALS_PREFIX}{session_id}");
        let mut items = match self.redis.take_list(&key).await {
            Ok(Some(raw)) => raw
                .iter()
                .filter_map(|value| serde_json::from_str::<IssuedCredential>(value).ok())
                .collect(),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to take credentials from Redis");
                Vec::new()
            }
        };

        let mut fallback = self.fallback.lock().await;
        fallback.prune(Instant::now());
        if let Some((_, local)) = fallback.credentials.remove(session_id) {
            items.extend(local);
        }

        items
    }

    pub(crate) async fn clear_credentials(&self, session_id: &str) {
        let key = format!("{CREDENTIALS_PREFIX}{session_id}");
        if let Err(err) = self.redis.delete(&key).await {
            tracing::warn!(error = %err, "Failed to clear credentials in Redis");
        }

        self.fallback.lock().await.credentials.remove(session_id);
    }
}
