//! Vault client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("DEFINDEX_API_KEY is not configured")]
    MissingApiKey,

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid vault address: {0:?}")]
    InvalidAddress(String),

    #[error("Request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("{0}")]
    Other(String),
}

impl VaultError {
    /// Maps a non-success status and its body to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => VaultError::Unauthorized,
            404 => VaultError::NotFound(body),
            429 => VaultError::RateLimited,
            400..=499 => VaultError::BadRequest(body),
            _ => VaultError::ServerError { status, body },
        }
    }
}
