//! The credential-managed client.
//!
//! `CredentialManagedClient` owns a [`BaseApiClient`] and a [`SecretStore`]
//! reference. At construction it loads the credential bundle and either resumes
//! the cached session or performs a fresh login. Every fresh session is written
//! back to the store. A call that fails with an expired session triggers one
//! re-authentication and one retry; nothing loops.
//!
//! A resumed session is not validated up front. Expiry shows up on the first
//! call, which then goes through the retry path.

use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{ApiError, ApiRequest, ApiResponse, BaseApiClient, RestClient, Session};
use crate::credentials::CredentialBundle;
use crate::error::{Error, Result};
use crate::store::SecretStore;

/// How the session was obtained at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// `SessionId`/`Instance` from the store were handed to the client.
    ResumedSession,
    /// A client-credentials login was performed.
    FreshLogin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Authenticating,
    Active,
    Failed,
}

#[derive(Default)]
pub struct CredentialManagedClientBuilder {
    identity_ref: Option<String>,
    secret_store: Option<Arc<dyn SecretStore>>,
}

impl CredentialManagedClientBuilder {
    /// Where the credential bundle lives in the secret store.
    pub fn identity_ref(mut self, identity_ref: impl Into<String>) -> Self {
        self.identity_ref = Some(identity_ref.into());
        self
    }

    pub fn secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secret_store = Some(store);
        self
    }

    fn validate(self) -> Result<(String, Arc<dyn SecretStore>)> {
        let identity_ref = self
            .identity_ref
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        match (identity_ref, self.secret_store) {
            (Some(identity_ref), Some(store)) => Ok((identity_ref, store)),
            (None, Some(_)) => Err(Error::Configuration("identity ref is required".to_string())),
            (Some(_), None) => Err(Error::Configuration(
                "secret store is not configured".to_string(),
            )),
            (None, None) => Err(Error::Configuration(
                "identity ref and secret store are required".to_string(),
            )),
        }
    }

    /// Load credentials and bring `client` to an active session.
    pub async fn connect<C: BaseApiClient>(self, client: C) -> Result<CredentialManagedClient<C>> {
        let (identity_ref, store) = self.validate()?;
        debug!(identity_ref = %identity_ref, "Constructing credential-managed client");

        let credentials = CredentialBundle::load(store.as_ref(), &identity_ref)?;

        let mut managed = CredentialManagedClient {
            inner: client,
            store,
            identity_ref,
            credentials,
            auth_mode: AuthMode::FreshLogin,
            state: SessionState::NoSession,
        };

        match managed.credentials.cached_session() {
            Some(session) => {
                info!(instance = %session.instance, "Resuming cached session");
                managed.inner.resume(session);
                managed.auth_mode = AuthMode::ResumedSession;
                managed.state = SessionState::Active;
            }
            None => {
                info!("No cached session, logging in with client credentials");
                managed.authenticate().await?;
            }
        }

        Ok(managed)
    }
}

pub struct CredentialManagedClient<C = RestClient> {
    inner: C,
    store: Arc<dyn SecretStore>,
    identity_ref: String,
    credentials: CredentialBundle,
    auth_mode: AuthMode,
    state: SessionState,
}

impl<C> fmt::Debug for CredentialManagedClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManagedClient")
            .field("identity_ref", &self.identity_ref)
            .field("credentials", &self.credentials)
            .field("auth_mode", &self.auth_mode)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CredentialManagedClient {
    /// Start building a client; the underlying client type is fixed by `connect`.
    pub fn builder() -> CredentialManagedClientBuilder {
        CredentialManagedClientBuilder::default()
    }
}

impl<C: BaseApiClient> CredentialManagedClient<C> {
    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn identity_ref(&self) -> &str {
        &self.identity_ref
    }

    pub fn credentials(&self) -> &CredentialBundle {
        &self.credentials
    }

    pub fn session(&self) -> Option<&Session> {
        self.inner.session()
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Re-read the bundle from the store, replacing the in-memory copy.
    pub fn load_credentials(&mut self) -> Result<()> {
        self.credentials = CredentialBundle::load(self.store.as_ref(), &self.identity_ref)?;
        Ok(())
    }

    /// Write the in-memory bundle to the store (full overwrite).
    pub fn save_credentials(&self) -> Result<()> {
        self.credentials.save(self.store.as_ref(), &self.identity_ref)
    }

    /// Record a newly established session in the bundle and persist it.
    pub fn on_session_refreshed(&mut self, session: &Session) -> Result<()> {
        self.credentials.set_session(session);
        self.save_credentials()
    }

    /// Fresh login with the bundle's identity, discarding the current session.
    ///
    /// The stale `SessionId`/`Instance` are dropped from the in-memory bundle
    /// before the login. The store keeps them until a new session is saved.
    pub async fn re_authenticate(&mut self) -> Result<()> {
        self.credentials.clear_session();
        self.authenticate().await
    }

    async fn authenticate(&mut self) -> Result<()> {
        self.state = SessionState::Authenticating;

        let client_credentials = match self.credentials.client_credentials() {
            Ok(c) => c,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e);
            }
        };

        match self.inner.login(&client_credentials).await {
            Ok(session) => {
                self.state = SessionState::Active;
                debug!(instance = %session.instance, "Session refreshed");
                self.on_session_refreshed(&session)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.state = SessionState::Failed;
                Err(e.into())
            }
        }
    }

    /// Dispatch a call, re-authenticating and retrying once on session expiry.
    pub async fn dispatch(
        &mut self,
        method: Method,
        target: &str,
        params: Option<Value>,
    ) -> Result<ApiResponse> {
        let request = ApiRequest::new(method, target, params);

        match self.inner.call(&request).await {
            Ok(response) => {
                self.state = SessionState::Active;
                Ok(response)
            }
            Err(ApiError::SessionExpired) => {
                info!(path = %request.target, "Session is expired. Re-authenticate and retry.");
                self.re_authenticate().await?;
                match self.inner.call(&request).await {
                    Ok(response) => Ok(response),
                    Err(e) => {
                        warn!(error = %e, "Retry after re-authentication failed");
                        self.state = SessionState::Failed;
                        Err(e.into())
                    }
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&mut self, target: &str, params: Option<Value>) -> Result<ApiResponse> {
        self.dispatch(Method::GET, target, params).await
    }

    pub async fn post(&mut self, target: &str, body: Value) -> Result<ApiResponse> {
        self.dispatch(Method::POST, target, Some(body)).await
    }

    pub async fn patch(&mut self, target: &str, body: Value) -> Result<ApiResponse> {
        self.dispatch(Method::PATCH, target, Some(body)).await
    }

    pub async fn delete(&mut self, target: &str) -> Result<ApiResponse> {
        self.dispatch(Method::DELETE, target, None).await
    }

    /// GET `target` and deserialize the body.
    pub async fn get_json<T: DeserializeOwned>(
        &mut self,
        target: &str,
        params: Option<Value>,
    ) -> Result<T> {
        Ok(self.get(target, params).await?.json()?)
    }
}
