//! Secret store capability and its backends.
//!
//! A `SecretStore` maps an identity ref to one opaque secret string. The
//! credential bundle is stored there as JSON; the store never interprets it.
//!
//! Backends:
//! - `FileSecretStore`: one file per identity ref under a directory
//! - `KeyringSecretStore`: one OS keychain entry per identity ref
//! - `MemorySecretStore`: process memory, for tests and local development

pub mod file;
pub mod keyring;
pub mod memory;

use std::fmt;

use thiserror::Error;

pub use self::file::FileSecretStore;
pub use self::keyring::KeyringSecretStore;
pub use self::memory::MemorySecretStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Secret store unavailable: {0}")]
    Unavailable(String),

    #[error("Secret store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] ::keyring::Error),
}

/// A secret as returned by the store.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue {
    pub secret_string: String,
}

impl SecretValue {
    pub fn new(secret_string: impl Into<String>) -> Self {
        Self {
            secret_string: secret_string.into(),
        }
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("secret_string", &format_args!("<{} bytes>", self.secret_string.len()))
            .finish()
    }
}

/// Blocking key-value secret storage.
///
/// Implementations must be `Send + Sync` so a store can be shared as
/// `Arc<dyn SecretStore>`.
pub trait SecretStore: Send + Sync {
    /// Read the secret stored under `identity_ref`.
    ///
    /// Returns `StoreError::NotFound` if nothing is stored there.
    fn get_secret_value(&self, identity_ref: &str) -> Result<SecretValue, StoreError>;

    /// Replace the secret stored under `identity_ref`.
    fn put_secret_value(&self, identity_ref: &str, secret_string: &str) -> Result<(), StoreError>;
}
