// Session registry module
// Provides session enumeration, per-user grouping, and forced termination
// over a pluggable store backend.

#![allow(dead_code)]

pub mod registry;
pub mod store;
pub mod types;

pub use registry::{RegistryState, SessionRegistry};
pub use store::{
    MemorySessionStore, RedisSessionStore, SessionStore, StoreError, create_session_store,
};
pub use types::{
    SessionDescriptor, SessionRecord, SessionUser, StoredSession, UserSessionGroup, decode_session,
};
