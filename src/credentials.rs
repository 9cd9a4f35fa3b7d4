use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::CompanionError;

/// Namespace every key is stored under.
pub const KEY_NAMESPACE: &str = "ytMusic";
const TOKEN_KEY: &str = "authToken";

/// Small persisted key-value store provided by the host.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), CompanionError>;
    fn delete(&self, key: &str) -> Result<(), CompanionError>;
}

/// In-process store; contents are lost when the process exits.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CompanionError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CompanionError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Persists the single auth token under a namespaced key.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_namespace(store, KEY_NAMESPACE)
    }

    pub fn with_namespace(store: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            store,
            namespace: namespace.to_string(),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}.{}", self.namespace, key)
    }

    pub fn token(&self) -> Option<String> {
        self.store.get(&self.key(TOKEN_KEY)).filter(|t| !t.is_empty())
    }

    pub fn store_token(&self, token: &str) -> Result<(), CompanionError> {
        debug!(key = %self.key(TOKEN_KEY), "Storing auth token.");
        self.store.set(&self.key(TOKEN_KEY), token)
    }

    pub fn clear_token(&self) -> Result<(), CompanionError> {
        debug!(key = %self.key(TOKEN_KEY), "Deleting auth token.");
        self.store.delete(&self.key(TOKEN_KEY))
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("namespace", &self.namespace)
            .finish()
    }
}
