use std::time::Duration;

/// Failure of a call to an external provider (generative model or weather).
/// Only the transient kinds are retried; every kind ends in fallback content
/// or a structured error at the boundary.
#[derive(Clone, Debug, thiserror::Error)]
pub enum UpstreamError {
    // Request or credential problems
    #[error("credential not configured for {0}")]
    MissingCredential(&'static str),
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    // Transient
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("server error {status}: {body}")]
    ServerError { status: u16, body: String },
    #[error("provider overloaded")]
    ProviderOverloaded,
    #[error("network error: {0}")]
    NetworkError(String),

    // Deadline spent
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl UpstreamError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::ServerError { .. }
                | Self::ProviderOverloaded
                | Self::NetworkError(_)
        )
    }

    pub fn suggested_delay(&self) -> Option<Duration> {
        if let Self::RateLimited { retry_after } = self {
            *retry_after
        } else {
            None
        }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::MissingCredential(_) => "missing_credential",
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::NotFound(_) => "not_found",
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidResponse(_) => "invalid_response",
            Self::RateLimited { .. } => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::ProviderOverloaded => "provider_overloaded",
            Self::NetworkError(_) => "network_error",
            Self::Timeout(_) => "timeout",
        }
    }

    /// Classify an HTTP status code into the appropriate error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            404 => Self::NotFound(body),
            400 => Self::InvalidRequest(body),
            429 => Self::RateLimited { retry_after: None },
            503 | 529 => Self::ProviderOverloaded,
            500..=599 => Self::ServerError { status, body },
            _ => Self::InvalidRequest(format!("unexpected status {status}: {body}")),
        }
    }

    /// Map a reqwest transport error, keeping timeouts distinct from other failures.
    pub fn from_transport(timed_out: bool, timeout: Duration, detail: String) -> Self {
        if timed_out {
            Self::Timeout(timeout)
        } else {
            Self::NetworkError(detail)
        }
    }
}
