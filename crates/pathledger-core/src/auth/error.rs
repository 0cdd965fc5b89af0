use thiserror::Error;

use crate::api::ApiError;

/// Failures of the durable token backends.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Token storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Token storage lock poisoned")]
    Poisoned,
}

/// Failures of the token endpoints. During a refresh every variant is
/// terminal for the session.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Login rejected: {0}")]
    LoginRejected(ApiError),

    #[error("No refresh token stored")]
    NoRefreshToken,

    #[error("Session ended while waiting for a token refresh")]
    SessionEnded,

    #[error("Token refresh rejected: {0}")]
    Rejected(ApiError),

    #[error("Network error reaching the token endpoint: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid token endpoint response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AuthError {
    /// Message fit for showing the user
    pub fn user_message(&self) -> String {
        match self {
            AuthError::LoginRejected(ApiError::Unauthorized) => {
                "Invalid username or password".to_string()
            }
            AuthError::LoginRejected(e) | AuthError::Rejected(e) => e.user_message(),
            AuthError::Network(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            AuthError::Network(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            other => other.to_string(),
        }
    }
}
