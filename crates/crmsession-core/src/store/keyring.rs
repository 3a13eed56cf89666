//! OS keychain [`SecretStore`] via the `keyring` crate.
//!
//! Each identity ref is one keychain entry under a fixed service name.

use keyring::Entry;

use super::{SecretStore, SecretValue, StoreError};

/// Default keychain service name
const SERVICE_NAME: &str = "crmsession";

pub struct KeyringSecretStore {
    service: String,
}

impl KeyringSecretStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, identity_ref: &str) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, identity_ref)?)
    }
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl SecretStore for KeyringSecretStore {
    fn get_secret_value(&self, identity_ref: &str) -> Result<SecretValue, StoreError> {
        match self.entry(identity_ref)?.get_password() {
            Ok(secret) => Ok(SecretValue::new(secret)),
            Err(keyring::Error::NoEntry) => Err(StoreError::NotFound(identity_ref.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn put_secret_value(&self, identity_ref: &str, secret_string: &str) -> Result<(), StoreError> {
        self.entry(identity_ref)?.set_password(secret_string)?;
        Ok(())
    }
}
