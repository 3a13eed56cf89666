//! The credential bundle stored in the secret store.
//!
//! One bundle per identity ref, serialized as a flat JSON record:
//!
//! ```json
//! {
//!   "Domain": "yourdomain.my",
//!   "ConsumerKey": "3MV.....",
//!   "ConsumerSecret": "1234ABCD....",
//!   "SessionId": "<authenticated token string>",
//!   "Instance": "<authenticated instance domain>"
//! }
//! ```
//!
//! `Domain` is the "My Domain" name without the trailing `.salesforce.com`.
//! `SessionId`/`Instance` are only written after a successful login.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::api::Session;
use crate::error::{Error, Result};
use crate::store::SecretStore;

const REDACTED: &str = "<redacted>";

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialBundle {
    #[serde(rename = "Domain")]
    pub domain: String,
    #[serde(rename = "ConsumerKey")]
    pub consumer_key: String,
    #[serde(rename = "ConsumerSecret")]
    pub consumer_secret: String,
    #[serde(rename = "SessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(rename = "Instance", default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Keys this crate does not own. Kept so a save does not drop them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CredentialBundle {
    /// A bundle with application identity only, no cached session.
    pub fn new(
        domain: impl Into<String>,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            session_id: None,
            instance: None,
            extra: Map::new(),
        }
    }

    pub fn from_secret_string(secret: &str) -> serde_json::Result<Self> {
        serde_json::from_str(secret)
    }

    pub fn to_secret_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Load the bundle stored under `identity_ref`.
    pub fn load(store: &dyn SecretStore, identity_ref: &str) -> Result<Self> {
        info!(identity_ref, "Loading credentials");
        let secret = store
            .get_secret_value(identity_ref)
            .map_err(|e| Error::load(identity_ref, e))?;
        let bundle = Self::from_secret_string(&secret.secret_string)
            .map_err(|e| Error::load(identity_ref, e))?;
        debug!(
            domain = %bundle.domain,
            cached_session = bundle.has_cached_session(),
            "Loaded credentials"
        );
        Ok(bundle)
    }

    /// Write the whole bundle under `identity_ref`, replacing what was there.
    pub fn save(&self, store: &dyn SecretStore, identity_ref: &str) -> Result<()> {
        info!(identity_ref, "Saving credentials");
        let secret = self
            .to_secret_string()
            .map_err(|e| Error::save(identity_ref, e))?;
        store
            .put_secret_value(identity_ref, &secret)
            .map_err(|e| Error::save(identity_ref, e))?;
        debug!(identity_ref, "Saved credentials");
        Ok(())
    }

    /// True when both session fields are present and non-empty.
    pub fn has_cached_session(&self) -> bool {
        matches!(
            (self.session_id.as_deref(), self.instance.as_deref()),
            (Some(id), Some(instance)) if !id.is_empty() && !instance.is_empty()
        )
    }

    /// The cached session, if both halves of it are usable.
    pub fn cached_session(&self) -> Option<Session> {
        if !self.has_cached_session() {
            return None;
        }
        match (&self.session_id, &self.instance) {
            (Some(id), Some(instance)) => Some(Session::new(id.clone(), instance.clone())),
            _ => None,
        }
    }

    /// Overwrite both session fields from a freshly established session.
    pub fn set_session(&mut self, session: &Session) {
        self.session_id = Some(session.session_id.clone());
        self.instance = Some(session.instance.clone());
    }

    /// Forget the cached session. Nothing is written to the store.
    pub fn clear_session(&mut self) {
        self.session_id = None;
        self.instance = None;
    }

    /// The identity needed for a client-credentials login.
    pub fn client_credentials(&self) -> Result<ClientCredentials> {
        if self.domain.trim().is_empty() {
            return Err(Error::IncompleteCredentials("Domain"));
        }
        if self.consumer_key.trim().is_empty() {
            return Err(Error::IncompleteCredentials("ConsumerKey"));
        }
        if self.consumer_secret.is_empty() {
            return Err(Error::IncompleteCredentials("ConsumerSecret"));
        }
        Ok(ClientCredentials {
            domain: self.domain.clone(),
            consumer_key: self.consumer_key.clone(),
            consumer_secret: self.consumer_secret.clone(),
        })
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("domain", &self.domain)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &REDACTED)
            .field("session_id", &self.session_id.as_ref().map(|_| REDACTED))
            .field("instance", &self.instance)
            .field("extra_keys", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Long-lived application identity used for a fresh login.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub domain: String,
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("domain", &self.domain)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &REDACTED)
            .finish()
    }
}
