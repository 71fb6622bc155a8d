//! Error types for the fleetca core

use thiserror::Error;

/// Result type alias using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while building or signing certificates
#[derive(Error, Debug)]
pub enum CoreError {
    /// The requested certificate violates a sign-time policy
    #[error("policy violation: {0}")]
    Policy(String),

    /// A validity endpoint could not be parsed or resolved
    #[error("invalid time value: {0}")]
    InvalidTime(String),

    /// SSH certificate construction or signing failed
    #[error("ssh signing error: {0}")]
    SshSign(#[from] ssh_key::Error),

    /// X.509 certificate construction or signing failed
    #[error("x509 signing error: {0}")]
    X509Sign(String),

    /// A PKCS#10 certificate request could not be parsed or verified
    #[error("invalid certificate request: {0}")]
    InvalidCsr(String),

    /// A PEM trust bundle contained a malformed certificate
    #[error("invalid certificate bundle: {0}")]
    InvalidBundle(String),
}

impl From<rcgen::Error> for CoreError {
    fn from(err: rcgen::Error) -> Self {
        CoreError::X509Sign(err.to_string())
    }
}
