/// Client error type
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport failure (connection refused, timeout, bad TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No session, or the server rejected the token
    #[error("Not signed in")]
    Unauthorized,

    /// Server answered with an error body
    #[error("API error {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ClientError {
    /// Whether a later retry may succeed without user action
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(_) => true,
            ClientError::Api { status, .. } => status.is_server_error(),
            ClientError::Unauthorized | ClientError::Config(_) => false,
        }
    }
}
