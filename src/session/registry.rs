// Session registry: the single entry point for session introspection and
// forced termination, isolating callers from the concrete store backend.

use super::store::{SessionStore, StoreError};
use super::types::{SessionDescriptor, UserSessionGroup, decode_session};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Registry over a pluggable session store.
///
/// Holds no state of its own; every enumeration recomputes its result from
/// the store, so results always reflect store state at call time.
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Enumerate all sessions, grouped by user.
    ///
    /// Anonymous records are filtered out before grouping. Group order and
    /// within-group order follow store enumeration order; no extra sorting
    /// is applied.
    pub async fn find_sessions(&self) -> Result<Vec<UserSessionGroup>, StoreError> {
        let stored = self.store.all().await?;

        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, Vec<SessionDescriptor>> = HashMap::new();

        for entry in &stored {
            if let Some(descriptor) = decode_session(entry) {
                if !grouped.contains_key(&descriptor.user_id) {
                    order.push(descriptor.user_id.clone());
                }
                grouped
                    .entry(descriptor.user_id.clone())
                    .or_default()
                    .push(descriptor);
            }
        }

        Ok(order
            .into_iter()
            .map(|user_id| {
                let sessions = grouped.remove(&user_id).unwrap_or_default();
                UserSessionGroup { user_id, sessions }
            })
            .collect())
    }

    /// Enumerate one user's sessions; a user with no sessions yields an
    /// empty vec, never an error
    pub async fn find_user_sessions(
        &self,
        user_id: &str,
    ) -> Result<Vec<SessionDescriptor>, StoreError> {
        let groups = self.find_sessions().await?;

        Ok(groups
            .into_iter()
            .find(|group| group.user_id == user_id)
            .map(|group| group.sessions)
            .unwrap_or_default())
    }

    /// Enumerate the sessions of every listed user, flattened into a single
    /// sequence (group boundaries are not preserved)
    pub async fn find_sessions_for_users(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<SessionDescriptor>, StoreError> {
        let groups = self.find_sessions().await?;

        Ok(groups
            .into_iter()
            .filter(|group| user_ids.contains(&group.user_id))
            .flat_map(|group| group.sessions)
            .collect())
    }

    /// Kill one session. Killing an id that no longer exists is a
    /// successful no-op; the store's receipt payload is passed through.
    pub async fn kill_session(&self, session_id: &str) -> Result<Option<Value>, StoreError> {
        let receipt = self.store.destroy(session_id).await?;
        info!("Session {} killed", session_id);
        Ok(receipt)
    }

    /// Kill every session of one user, strictly sequentially in enumeration
    /// order. The first failed destroy aborts the remainder and propagates;
    /// sessions already destroyed stay destroyed.
    pub async fn kill_user_sessions(
        &self,
        user_id: &str,
    ) -> Result<Vec<Option<Value>>, StoreError> {
        let sessions = self.find_user_sessions(user_id).await?;

        let mut receipts = Vec::with_capacity(sessions.len());
        for session in &sessions {
            let receipt = self.store.destroy(&session.id).await?;
            receipts.push(receipt);
        }

        info!("Killed {} sessions for user {}", receipts.len(), user_id);
        Ok(receipts)
    }
}

/// Registry state for use in axum handlers
#[derive(Clone)]
pub struct RegistryState {
    pub registry: Arc<SessionRegistry>,
}

impl RegistryState {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new(store)),
        }
    }
}
