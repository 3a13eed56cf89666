use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session expired or invalid")]
    SessionExpired,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::SessionExpired,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_session_expired());
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, "nope"),
            ApiError::AccessDenied(ref b) if b == "nope"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "MALFORMED_QUERY"),
            ApiError::InvalidResponse(ref m) if m.contains("400") && m.contains("MALFORMED_QUERY")
        ));
    }

    #[test]
    fn test_truncate_body() {
        let short = "x".repeat(10);
        assert_eq!(ApiError::truncate_body(&short), short);

        let long = "y".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"y".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("520 total bytes"));
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let long = "é".repeat(MAX_ERROR_BODY_LENGTH);
        // must not panic on a multi-byte boundary
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated"));
    }
}
