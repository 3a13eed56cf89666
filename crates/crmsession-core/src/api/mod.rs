//! CRM API client capability.
//!
//! `BaseApiClient` is the seam the credential-managed client wraps: a fresh
//! client-credentials login, adoption of a cached session, and generic call
//! dispatch. `RestClient` implements it over HTTPS with reqwest.
//!
//! Sessions are bearer tokens bound to one server instance.

pub mod client;
pub mod error;
pub mod rest;

pub use client::{ApiRequest, ApiResponse, BaseApiClient, Session};
pub use error::ApiError;
pub use rest::{RestClient, RestClientConfig};
