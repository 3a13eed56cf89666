//! Credential-managed CRM API client.
//!
//! `crmsession-core` wraps a CRM API client with a session lifecycle backed by
//! a secret store:
//!
//! - `CredentialBundle`: the stored application identity plus the cached session
//! - `SecretStore`: where bundles live (`FileSecretStore`, `KeyringSecretStore`,
//!   `MemorySecretStore`)
//! - `BaseApiClient`: the underlying client capability, with `RestClient` as the
//!   reqwest-backed implementation
//! - `CredentialManagedClient`: resumes cached sessions, persists fresh ones and
//!   re-authenticates once when a call reports an expired session
//!
//! ```no_run
//! use std::sync::Arc;
//! use crmsession_core::{CredentialManagedClient, FileSecretStore, Method, RestClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(FileSecretStore::new("/var/lib/crmsession"));
//! let mut client = CredentialManagedClient::builder()
//!     .identity_ref("arn:aws:secretsmanager:us-east-1:123456789012:secret:crm")
//!     .secret_store(store)
//!     .connect(RestClient::new()?)
//!     .await?;
//!
//! let accounts = client.dispatch(Method::GET, "sobjects/Account", None).await?;
//! println!("{}", accounts.body);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod managed;
pub mod store;

pub use api::{ApiError, ApiRequest, ApiResponse, BaseApiClient, RestClient, RestClientConfig, Session};
pub use config::{Config, StoreBackend};
pub use credentials::{ClientCredentials, CredentialBundle};
pub use error::{Error, Result};
pub use managed::{AuthMode, CredentialManagedClient, CredentialManagedClientBuilder, SessionState};
pub use reqwest::Method;
pub use store::{
    FileSecretStore, KeyringSecretStore, MemorySecretStore, SecretStore, SecretValue, StoreError,
};
