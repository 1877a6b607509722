// Session store backends
// In-memory store with periodic pruning, and a shared Redis store with
// TTL-based expiry for multi-instance deployments.

use super::types::{SessionRecord, StoredSession};
use crate::models::{SessionManagerKind, SessionSettings};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::{AsyncCommands, aio::MultiplexedConnection};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Redis key prefix for session entries
const SESSION_KEY_PREFIX: &str = "sess:";

/// Store errors
#[derive(Debug, Clone)]
pub enum StoreError {
    Unavailable(String),
    Serialization(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "Session store unavailable: {}", msg),
            StoreError::Serialization(msg) => write!(f, "Session record serialization: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Trait for session store backends.
///
/// All operations take and return bare session ids; each backend owns its
/// native key construction (prefixing is never the caller's concern).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Enumerate every live session record; ordering is unspecified and
    /// expired entries never surface
    async fn all(&self) -> Result<Vec<StoredSession>, StoreError>;

    /// Get one record, `None` when absent or expired
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Persist or overwrite a record under the configured max age
    async fn set(&self, session_id: &str, record: SessionRecord) -> Result<(), StoreError>;

    /// Sliding expiry: reset the record's TTL to the configured max age;
    /// no-op when the id is absent
    async fn touch(&self, session_id: &str) -> Result<(), StoreError>;

    /// Delete a record; deleting a missing id is a successful no-op.
    /// Returns the backend's receipt payload, which may be empty.
    async fn destroy(&self, session_id: &str) -> Result<Option<Value>, StoreError>;
}

struct MemoryEntry {
    record: SessionRecord,
    expires_at: DateTime<Utc>,
}

/// In-process session store.
///
/// Entries carry an absolute deadline; expired entries are invisible to
/// reads and purged by `prune_expired`, which `spawn_pruner` runs on the
/// configured check period.
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, MemoryEntry>>>,
    max_age_secs: i64,
    check_period: std::time::Duration,
}

impl MemorySessionStore {
    pub fn new(max_age_secs: i64, check_period_ms: u64) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_age_secs,
            check_period: std::time::Duration::from_millis(check_period_ms),
        }
    }

    fn deadline(&self) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(self.max_age_secs)
    }

    /// Remove every expired entry, returning how many were purged
    pub async fn prune_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let now = Utc::now();

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();

        let count = expired.len();
        for id in expired {
            entries.remove(&id);
        }

        if count > 0 {
            debug!("Pruned {} expired sessions", count);
        }

        count
    }

    /// Run `prune_expired` on the check period until the process exits
    pub fn spawn_pruner(self: &Arc<Self>) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(store.check_period);
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                store.prune_expired().await;
            }
        });
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn all(&self) -> Result<Vec<StoredSession>, StoreError> {
        let entries = self.entries.read().await;
        let now = Utc::now();

        let sessions = entries
            .iter()
            .filter(|(_, entry)| entry.expires_at > now)
            .map(|(id, entry)| StoredSession {
                id: id.clone(),
                ttl_secs: (entry.expires_at - now).num_seconds(),
                record: entry.record.clone(),
            })
            .collect();

        Ok(sessions)
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let entries = self.entries.read().await;
        let now = Utc::now();

        Ok(entries
            .get(session_id)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.record.clone()))
    }

    async fn set(&self, session_id: &str, record: SessionRecord) -> Result<(), StoreError> {
        let expires_at = self.deadline();
        let mut entries = self.entries.write().await;
        entries.insert(
            session_id.to_string(),
            MemoryEntry { record, expires_at },
        );
        Ok(())
    }

    async fn touch(&self, session_id: &str) -> Result<(), StoreError> {
        let deadline = self.deadline();
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(session_id) {
            entry.expires_at = deadline;
        }
        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<Option<Value>, StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(session_id);
        Ok(None)
    }
}

/// Shared session store backed by Redis.
///
/// Records are stored as JSON under `sess:<id>` with the configured TTL;
/// expiry is enforced by Redis itself.
pub struct RedisSessionStore {
    conn: Arc<Mutex<MultiplexedConnection>>,
    ttl_secs: u64,
}

impl RedisSessionStore {
    pub async fn new(redis_url: &str, ttl_secs: u64) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            ttl_secs,
        })
    }

    fn session_key(&self, session_id: &str) -> String {
        format!("{}{}", SESSION_KEY_PREFIX, session_id)
    }

    fn bare_id(key: &str) -> &str {
        key.strip_prefix(SESSION_KEY_PREFIX).unwrap_or(key)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn all(&self) -> Result<Vec<StoredSession>, StoreError> {
        let mut conn = self.conn.lock().await;

        let keys: Vec<String> = {
            let mut iter = conn
                .scan_match::<_, String>(format!("{}*", SESSION_KEY_PREFIX))
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        let mut sessions = Vec::with_capacity(keys.len());
        for key in keys {
            let raw: Option<String> = conn
                .get(&key)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

            // Key may have expired between SCAN and GET
            let Some(raw) = raw else { continue };

            let record: SessionRecord = match serde_json::from_str(&raw) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping undecodable session record {}: {}", key, e);
                    continue;
                }
            };

            let ttl_secs: i64 = conn
                .ttl(&key)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

            sessions.push(StoredSession {
                id: Self::bare_id(&key).to_string(),
                ttl_secs,
                record,
            });
        }

        Ok(sessions)
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let mut conn = self.conn.lock().await;

        let raw: Option<String> = conn
            .get(self.session_key(session_id))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        match raw {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    async fn set(&self, session_id: &str, record: SessionRecord) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut conn = self.conn.lock().await;
        let _: () = conn
            .set_ex(self.session_key(session_id), payload, self.ttl_secs)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(())
    }

    async fn touch(&self, session_id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        let _: bool = conn
            .expire(self.session_key(session_id), self.ttl_secs as i64)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<Option<Value>, StoreError> {
        let mut conn = self.conn.lock().await;

        // DEL of a missing key returns 0, which is still a successful no-op
        let deleted: i64 = conn
            .del(self.session_key(session_id))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Some(json!({ "deleted": deleted })))
    }
}

/// Factory to create the session store based on configuration.
///
/// The memory variant starts its background pruner before the handle is
/// handed out.
pub async fn create_session_store(
    settings: &SessionSettings,
) -> Result<Arc<dyn SessionStore>, StoreError> {
    match settings.manager {
        SessionManagerKind::Memory => {
            info!(
                "Using in-memory session store (check period {} ms)",
                settings.check_period_ms
            );
            let store = Arc::new(MemorySessionStore::new(
                settings.timeout_secs as i64,
                settings.check_period_ms,
            ));
            store.spawn_pruner();
            Ok(store)
        }
        SessionManagerKind::Shared => {
            let redis_url = settings.redis_url.as_deref().ok_or_else(|| {
                StoreError::Unavailable(
                    "shared session manager requires session.redis_url".to_string(),
                )
            })?;
            info!(
                "Using shared Redis session store (ttl {} secs)",
                settings.timeout_secs
            );
            let store = RedisSessionStore::new(redis_url, settings.timeout_secs).await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get_record() {
        let store = MemorySessionStore::new(3600, 3_600_000);
        let record = SessionRecord::for_user("user-123", 60_000);

        store.set("sess-a", record).await.unwrap();

        let retrieved = store.get("sess-a").await.unwrap();
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().user.unwrap().id, "user-123");
    }

    #[tokio::test]
    async fn test_all_reports_remaining_ttl() {
        let store = MemorySessionStore::new(3600, 3_600_000);
        store
            .set("sess-a", SessionRecord::for_user("user-123", 60_000))
            .await
            .unwrap();

        let sessions = store.all().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "sess-a");
        assert!(sessions[0].ttl_secs > 3590 && sessions[0].ttl_secs <= 3600);
    }

    #[tokio::test]
    async fn test_expired_entries_are_invisible() {
        // max age of zero expires entries immediately
        let store = MemorySessionStore::new(0, 3_600_000);
        store
            .set("sess-a", SessionRecord::for_user("user-123", 60_000))
            .await
            .unwrap();

        assert!(store.get("sess-a").await.unwrap().is_none());
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prune_removes_expired_entries() {
        let store = MemorySessionStore::new(0, 3_600_000);
        store
            .set("sess-a", SessionRecord::for_user("user-123", 60_000))
            .await
            .unwrap();
        store
            .set("sess-b", SessionRecord::anonymous(60_000))
            .await
            .unwrap();

        let pruned = store.prune_expired().await;
        assert_eq!(pruned, 2);
        assert_eq!(store.prune_expired().await, 0);
    }

    #[tokio::test]
    async fn test_destroy_missing_id_is_a_noop() {
        let store = MemorySessionStore::new(3600, 3_600_000);
        let receipt = store.destroy("no-such-session").await;
        assert!(receipt.is_ok());
    }

    #[tokio::test]
    async fn test_touch_resets_deadline() {
        let store = MemorySessionStore::new(3600, 3_600_000);
        store
            .set("sess-a", SessionRecord::for_user("user-123", 60_000))
            .await
            .unwrap();

        store.touch("sess-a").await.unwrap();
        let sessions = store.all().await.unwrap();
        assert!(sessions[0].ttl_secs > 3590);

        // Touching a missing id must not create an entry
        store.touch("no-such-session").await.unwrap();
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    // Note: These tests require a Redis instance running
    // Skip them in CI unless Redis is available

    #[tokio::test]
    #[ignore] // Remove this to run with a local Redis instance
    async fn test_redis_roundtrip() {
        let store = RedisSessionStore::new("redis://127.0.0.1/", 60)
            .await
            .expect("Failed to connect to Redis");

        store
            .set("test-sess", SessionRecord::for_user("user-123", 60_000))
            .await
            .unwrap();

        let sessions = store.all().await.unwrap();
        let found = sessions.iter().find(|s| s.id == "test-sess").unwrap();
        assert!(found.ttl_secs > 0 && found.ttl_secs <= 60);

        let receipt = store.destroy("test-sess").await.unwrap();
        assert_eq!(receipt.unwrap()["deleted"], 1);

        // Second destroy is a no-op
        let receipt = store.destroy("test-sess").await.unwrap();
        assert_eq!(receipt.unwrap()["deleted"], 0);
    }
}
