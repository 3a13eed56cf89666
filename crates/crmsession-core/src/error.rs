//! Error taxonomy for the credential-managed client.

use thiserror::Error;

use crate::api::ApiError;

/// Boxed cause for credential load/save failures (store or JSON errors).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to load credentials for {identity_ref}: {source}")]
    CredentialLoad {
        identity_ref: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to save credentials for {identity_ref}: {source}")]
    CredentialSave {
        identity_ref: String,
        #[source]
        source: BoxError,
    },

    #[error("Credential bundle is missing a value for {0}")]
    IncompleteCredentials(&'static str),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub(crate) fn load(identity_ref: &str, source: impl Into<BoxError>) -> Self {
        Error::CredentialLoad {
            identity_ref: identity_ref.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn save(identity_ref: &str, source: impl Into<BoxError>) -> Self {
        Error::CredentialSave {
            identity_ref: identity_ref.to_string(),
            source: source.into(),
        }
    }

    /// True when the underlying client reported an expired session.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::Api(ApiError::SessionExpired))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
