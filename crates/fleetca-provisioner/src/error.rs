//! Error types for one-time-token validation

use thiserror::Error;

/// Result type for provisioner operations
pub type Result<T> = std::result::Result<T, OttError>;

/// Errors that can occur while authorizing a one-time token
#[derive(Error, Debug)]
pub enum OttError {
    /// Token validation failed
    #[error("token validation failed: {0}")]
    ValidationFailed(String),

    /// Token has expired
    #[error("token has expired")]
    Expired,

    /// Token not yet valid
    #[error("token is not yet valid")]
    NotYetValid,

    /// Invalid token format
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    /// Invalid signature
    #[error("invalid token signature: {0}")]
    InvalidSignature(String),

    /// Invalid audience
    #[error("token audience does not match this authority")]
    InvalidAudience,

    /// Missing required claim
    #[error("token is missing required claim: {0}")]
    MissingClaim(String),

    /// The token was already used to sign a certificate
    #[error("token {0} has already been used")]
    TokenReplayed(String),

    /// The token does not authorize the requested method
    #[error("token does not authorize method {0}")]
    MethodNotAllowed(String),
}

impl From<jsonwebtoken::errors::Error> for OttError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => OttError::Expired,
            ErrorKind::ImmatureSignature => OttError::NotYetValid,
            ErrorKind::InvalidSignature => OttError::InvalidSignature(err.to_string()),
            ErrorKind::InvalidToken => OttError::InvalidFormat(err.to_string()),
            ErrorKind::InvalidAudience => OttError::InvalidAudience,
            _ => OttError::ValidationFailed(err.to_string()),
        }
    }
}
