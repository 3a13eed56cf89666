//! In-memory [`SecretStore`] backed by `Arc<Mutex<HashMap>>`.
//!
//! Suitable for tests and local development. Nothing is persisted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{SecretStore, SecretValue, StoreError};

/// Clone shares state: every clone sees the same secrets.
///
/// A panic while the lock is held does not make the store unusable; the map
/// is only ever replaced one entry at a time.
#[derive(Clone, Default)]
pub struct MemorySecretStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a secret without going through the trait.
    pub fn insert(&self, identity_ref: impl Into<String>, secret_string: impl Into<String>) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity_ref.into(), secret_string.into());
    }

    /// The raw stored string, if any.
    pub fn raw(&self, identity_ref: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity_ref)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretStore for MemorySecretStore {
    fn get_secret_value(&self, identity_ref: &str) -> Result<SecretValue, StoreError> {
        self.raw(identity_ref)
            .map(SecretValue::new)
            .ok_or_else(|| StoreError::NotFound(identity_ref.to_string()))
    }

    fn put_secret_value(&self, identity_ref: &str, secret_string: &str) -> Result<(), StoreError> {
        self.insert(identity_ref, secret_string);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_get() {
        let store = MemorySecretStore::new();
        store.put_secret_value("ref", "{}").unwrap();
        assert_eq!(store.get_secret_value("ref").unwrap().secret_string, "{}");
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let store = MemorySecretStore::new();
        let err = store.get_secret_value("missing").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref id) if id == "missing"));
    }

    #[test]
    fn test_put_overwrites() {
        let store = MemorySecretStore::new();
        store.put_secret_value("ref", "v1").unwrap();
        store.put_secret_value("ref", "v2").unwrap();
        assert_eq!(store.raw("ref").as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clone_shares_state() {
        let store = MemorySecretStore::new();
        assert!(store.is_empty());
        store.clone().insert("ref", "shared");
        assert_eq!(store.raw("ref").as_deref(), Some("shared"));
    }

    #[test]
    fn test_secret_value_debug_hides_content() {
        let value = SecretValue::new("hunter2");
        let debug = format!("{value:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("7 bytes"));
    }

    #[test]
    fn test_store_survives_poisoned_lock() {
        let store = MemorySecretStore::new();
        store.insert("ref", "before");

        let shared = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.inner.lock().unwrap();
            panic!("panic while holding the lock");
        })
        .join();
        assert!(store.inner.is_poisoned());

        assert_eq!(store.get_secret_value("ref").unwrap().secret_string, "before");
        store.put_secret_value("ref", "after").unwrap();
        assert_eq!(store.raw("ref").as_deref(), Some("after"));
    }
}
