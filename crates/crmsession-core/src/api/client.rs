//! The `BaseApiClient` capability and the values it exchanges.

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ApiError;
use crate::credentials::ClientCredentials;

/// An authenticated session: bearer token plus the instance it is bound to.
#[derive(Clone)]
pub struct Session {
    pub session_id: String,
    /// Instance host, e.g. `yourdomain.my.salesforce.com`.
    pub instance: String,
    /// When this process created or resumed the session. Not persisted.
    pub established_at: DateTime<Utc>,
}

impl Session {
    pub fn new(session_id: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            instance: instance.into(),
            established_at: Utc::now(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &"<redacted>")
            .field("instance", &self.instance)
            .field("established_at", &self.established_at)
            .finish()
    }
}

/// One remote call: HTTP method, target path and optional parameters.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub target: String,
    pub params: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, target: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            method,
            target: target.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body, `Value::Null` when the body was empty.
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Deserialize the body into `T`.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response body: {}", e)))
    }
}

/// The underlying CRM client.
///
/// `login` is the session-refresh hook: every session it returns is a new one
/// and the caller is expected to persist it.
pub trait BaseApiClient: Send {
    /// Perform a fresh client-credentials login, replacing any current session.
    fn login(
        &mut self,
        credentials: &ClientCredentials,
    ) -> impl Future<Output = Result<Session, ApiError>> + Send;

    /// Adopt a previously cached session without contacting the server.
    fn resume(&mut self, session: Session);

    /// Dispatch one call with the current session.
    ///
    /// Must report an expired or missing session as `ApiError::SessionExpired`.
    fn call(
        &mut self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send;

    /// The session currently in use, if any.
    fn session(&self) -> Option<&Session>;
}
