//! HTTPS implementation of [`BaseApiClient`] for the CRM REST API.
//!
//! Only two pieces of the wire protocol live here: the OAuth 2.0
//! client-credentials token exchange and a generic authenticated request
//! against `/services/data/v{version}/`.

use std::time::Duration;

use reqwest::{header, Client, Method};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{ApiError, ApiRequest, ApiResponse, BaseApiClient, Session};
use crate::credentials::ClientCredentials;

// ============================================================================
// Constants
// ============================================================================

/// Suffix appended to the bundle's `Domain` to form the login host.
const LOGIN_HOST_SUFFIX: &str = "salesforce.com";

/// OAuth token endpoint, relative to the login URL.
const TOKEN_PATH: &str = "/services/oauth2/token";

/// REST API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "59.0";

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

#[derive(Debug, Clone)]
pub struct RestClientConfig {
    /// Overrides `https://{Domain}.salesforce.com` for the token exchange.
    pub login_url: Option<String>,
    pub api_version: String,
    pub request_timeout: Duration,
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            login_url: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// REST client for the CRM API.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    config: RestClientConfig,
    session: Option<Session>,
}

impl RestClient {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_config(RestClientConfig::default())
    }

    pub fn with_config(config: RestClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            config,
            session: None,
        })
    }

    fn token_url(&self, domain: &str) -> String {
        match self.config.login_url {
            Some(ref url) => format!("{}{}", url.trim_end_matches('/'), TOKEN_PATH),
            None => format!("https://{}.{}{}", domain, LOGIN_HOST_SUFFIX, TOKEN_PATH),
        }
    }

    /// Instance as stored in the bundle: host only when the server used https.
    fn instance_from_url(instance_url: &str) -> String {
        let trimmed = instance_url.trim_end_matches('/');
        trimmed.strip_prefix("https://").unwrap_or(trimmed).to_string()
    }

    fn instance_base(instance: &str) -> String {
        if instance.contains("://") {
            instance.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", instance.trim_end_matches('/'))
        }
    }

    fn request_url(&self, instance: &str, target: &str) -> String {
        let base = Self::instance_base(instance);
        if target.starts_with('/') {
            format!("{}{}", base, target)
        } else {
            format!("{}/services/data/v{}/{}", base, self.config.api_version, target)
        }
    }

    /// Flatten a JSON object into query pairs. Strings are sent unquoted.
    fn query_pairs(params: &Value) -> Result<Vec<(String, String)>, ApiError> {
        let object = params.as_object().ok_or_else(|| {
            ApiError::InvalidRequest("query parameters must be a JSON object".to_string())
        })?;
        Ok(object
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect())
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

impl BaseApiClient for RestClient {
    async fn login(&mut self, credentials: &ClientCredentials) -> Result<Session, ApiError> {
        // A failed login must not leave the previous token in use.
        self.session = None;
        let url = self.token_url(&credentials.domain);
        info!(domain = %credentials.domain, "Requesting client-credentials token");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.consumer_key.as_str()),
                ("client_secret", credentials.consumer_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Token request rejected");
            return Err(ApiError::AuthenticationFailed(format!(
                "Status {}: {}",
                status,
                ApiError::truncate_body(&body)
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse token response: {}", e))
        })?;

        let session = Session::new(token.access_token, Self::instance_from_url(&token.instance_url));
        debug!(instance = %session.instance, "Established new session");
        self.session = Some(session.clone());
        Ok(session)
    }

    fn resume(&mut self, session: Session) {
        debug!(instance = %session.instance, "Resuming cached session");
        self.session = Some(session);
    }

    async fn call(&mut self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let session = self.session.as_ref().ok_or(ApiError::SessionExpired)?;
        let url = self.request_url(&session.instance, &request.target);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .bearer_auth(&session.session_id)
            .header(header::ACCEPT, "application/json");

        if let Some(ref params) = request.params {
            if request.method == Method::GET || request.method == Method::DELETE {
                builder = builder.query(&Self::query_pairs(params)?);
            } else {
                builder = builder.json(params);
            }
        }

        let response = builder.send().await?;
        let response = Self::check_response(response).await?;
        let status = response.status().as_u16();

        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
            })?
        };

        Ok(ApiResponse::new(status, body))
    }

    fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}
