// Session types and the record-to-descriptor codec

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity attached to an authenticated session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    /// User ID
    pub id: String,
    /// When the user logged in and the session was created
    pub session_creation: DateTime<Utc>,
}

/// Cookie settings carried by a session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCookie {
    /// Configured max age of the session, in milliseconds
    #[serde(rename = "originalMaxAge")]
    pub original_max_age: u64,
}

/// Raw session record as persisted by the store.
///
/// `user` is absent for anonymous entries (e.g. a session created before
/// authentication completed); those records never surface through the
/// registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub user: Option<SessionUser>,
    pub cookie: SessionCookie,
}

impl SessionRecord {
    /// Build a record for a freshly authenticated user
    pub fn for_user(user_id: impl Into<String>, max_age_ms: u64) -> Self {
        Self {
            user: Some(SessionUser {
                id: user_id.into(),
                session_creation: Utc::now(),
            }),
            cookie: SessionCookie {
                original_max_age: max_age_ms,
            },
        }
    }

    /// Build an anonymous record (no resolvable user)
    pub fn anonymous(max_age_ms: u64) -> Self {
        Self {
            user: None,
            cookie: SessionCookie {
                original_max_age: max_age_ms,
            },
        }
    }
}

/// A session record tagged with its bare session id and the remaining TTL
/// reported by the store at read time
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub id: String,
    pub ttl_secs: i64,
    pub record: SessionRecord,
}

/// Decoded, caller-facing view of one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionDescriptor {
    pub id: String,
    pub user_id: String,
    pub created: DateTime<Utc>,
    /// Remaining time-to-live in seconds, as reported by the store
    pub ttl: i64,
    /// Configured max age in whole seconds
    #[serde(rename = "originalMaxAge")]
    pub original_max_age: u64,
}

/// All active sessions of one user, in store enumeration order
#[derive(Debug, Clone, Serialize)]
pub struct UserSessionGroup {
    pub user_id: String,
    pub sessions: Vec<SessionDescriptor>,
}

/// Decode one stored record into a descriptor.
///
/// Returns `None` for anonymous records; exclusion is a filtering policy,
/// not an error. The max age is converted from milliseconds to whole
/// seconds, rounded to nearest.
pub fn decode_session(stored: &StoredSession) -> Option<SessionDescriptor> {
    let user = stored.record.user.as_ref()?;
    Some(SessionDescriptor {
        id: stored.id.clone(),
        user_id: user.id.clone(),
        created: user.session_creation,
        ttl: stored.ttl_secs,
        original_max_age: (stored.record.cookie.original_max_age + 500) / 1000,
    })
}
