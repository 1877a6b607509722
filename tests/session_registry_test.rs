use cti_session_registry::session::registry::SessionRegistry;
use cti_session_registry::session::store::{MemorySessionStore, SessionStore};
use cti_session_registry::session::types::SessionRecord;
use std::sync::Arc;

async fn seeded_store() -> Arc<MemorySessionStore> {
    let store = Arc::new(MemorySessionStore::new(3600, 3_600_000));

    store
        .set("sess:A", SessionRecord::for_user("u1", 60_000))
        .await
        .unwrap();
    store
        .set("sess:B", SessionRecord::for_user("u2", 60_000))
        .await
        .unwrap();
    // Anonymous record, e.g. a session created before login completed
    store
        .set("sess:C", SessionRecord::anonymous(60_000))
        .await
        .unwrap();

    store
}

/// Seed two authenticated sessions plus one anonymous record: enumeration
/// must return exactly two single-session groups, the anonymous record
/// must not appear anywhere.
#[tokio::test]
async fn test_enumeration_groups_users_and_hides_anonymous() {
    let store = seeded_store().await;
    let registry = SessionRegistry::new(store as Arc<dyn SessionStore>);

    let groups = registry.find_sessions().await.unwrap();
    assert_eq!(groups.len(), 2);

    let mut user_ids: Vec<&str> = groups.iter().map(|g| g.user_id.as_str()).collect();
    user_ids.sort();
    assert_eq!(user_ids, vec!["u1", "u2"]);

    for group in &groups {
        assert_eq!(group.sessions.len(), 1);
        assert_eq!(group.sessions[0].original_max_age, 60);
        assert!(group.sessions[0].ttl > 0);
    }
}

#[tokio::test]
async fn test_user_filter_and_unknown_user() {
    let store = seeded_store().await;
    let registry = SessionRegistry::new(store as Arc<dyn SessionStore>);

    let sessions = registry.find_user_sessions("u1").await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, "sess:A");

    // A user with no records yields an empty list, not an error
    let sessions = registry.find_user_sessions("u9").await.unwrap();
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn test_multi_user_enumeration_is_flattened() {
    let store = Arc::new(MemorySessionStore::new(3600, 3_600_000));
    for (id, user) in [
        ("sess:A", "u1"),
        ("sess:B", "u2"),
        ("sess:C", "u3"),
        ("sess:D", "u3"),
    ] {
        store
            .set(id, SessionRecord::for_user(user, 60_000))
            .await
            .unwrap();
    }

    let registry = SessionRegistry::new(store as Arc<dyn SessionStore>);
    let sessions = registry
        .find_sessions_for_users(&["u1".to_string(), "u3".to_string()])
        .await
        .unwrap();

    assert_eq!(sessions.len(), 3);
    assert!(sessions.iter().all(|s| s.user_id != "u2"));
}

#[tokio::test]
async fn test_kill_flow_end_to_end() {
    let store = seeded_store().await;
    let registry = SessionRegistry::new(Arc::clone(&store) as Arc<dyn SessionStore>);

    // Kill one session by id
    registry.kill_session("sess:A").await.unwrap();
    assert!(registry.find_user_sessions("u1").await.unwrap().is_empty());

    // Killing it again is a no-op, not an error
    assert!(registry.kill_session("sess:A").await.is_ok());

    // Kill all remaining sessions of u2
    let receipts = registry.kill_user_sessions("u2").await.unwrap();
    assert_eq!(receipts.len(), 1);
    assert!(registry.find_user_sessions("u2").await.unwrap().is_empty());

    // The anonymous record is untouched in the store itself
    assert!(store.get("sess:C").await.unwrap().is_some());
}
