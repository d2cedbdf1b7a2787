//! Session identity as seen by the router
//!
//! The router only asks two questions: is someone signed in, and who. How
//! the answer is persisted sits behind [`SessionStore`].

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Key under which [`StoredSession`] keeps the JSON-encoded user
pub const USER_KEY: &str = "user";

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: String,
    pub role: String,
}

impl User {
    pub fn new(id: impl ToString, role: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            role: role.into(),
        }
    }
}

fn id_from_number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// Read-only identity capability consumed by the middleware pipeline
pub trait SessionProvider: Send + Sync {
    fn is_authenticated(&self) -> bool;

    fn current_user(&self) -> Option<User>;
}

/// Key-value persistence behind a session
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String);

    fn remove(&self, key: &str);

    fn clear(&self);
}

/// In-memory session store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
        }
    }

    fn clear(&self) {
        if let Ok(mut values) = self.values.lock() {
            values.clear();
        }
    }
}

/// Session backed by a store holding the user as JSON
pub struct StoredSession<S: SessionStore> {
    store: S,
}

impl<S: SessionStore> StoredSession<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persists `user` as the signed-in identity
    pub fn sign_in(&self, user: &User) -> serde_json::Result<()> {
        self.store.set(USER_KEY, serde_json::to_string(user)?);
        Ok(())
    }

    pub fn sign_out(&self) {
        self.store.remove(USER_KEY);
    }
}

impl StoredSession<MemorySessionStore> {
    /// Anonymous in-memory session
    pub fn in_memory() -> Self {
        Self::new(MemorySessionStore::new())
    }
}

impl<S: SessionStore> SessionProvider for StoredSession<S> {
    fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    fn current_user(&self) -> Option<User> {
        let raw = self.store.get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Stored user is not valid JSON, treating session as anonymous");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_by_default() {
        let session = StoredSession::in_memory();
        assert!(!session.is_authenticated());
        assert_eq!(session.current_user(), None);
    }

    #[test]
    fn test_sign_in_and_out() {
        let session = StoredSession::in_memory();
        session.sign_in(&User::new(7, "teacher")).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.current_user(), Some(User::new("7", "teacher")));

        session.sign_out();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_numeric_id_from_store() {
        let session = StoredSession::in_memory();
        session.store().set(USER_KEY, r#"{"id": 42, "role": "student"}"#.to_string());
        assert_eq!(session.current_user().unwrap().id, "42");
    }

    #[test]
    fn test_corrupt_user_is_anonymous() {
        let session = StoredSession::in_memory();
        session.store().set(USER_KEY, "{not json".to_string());
        assert!(!session.is_authenticated());
    }
}
