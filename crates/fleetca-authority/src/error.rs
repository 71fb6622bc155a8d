//! Error types for the authority

use fleetca_core::CoreError;
use fleetca_provisioner::OttError;
use thiserror::Error;

use crate::storage::DbError;

/// Result type alias using CaError
pub type Result<T> = std::result::Result<T, CaError>;

/// Errors surfaced by authority operations.
///
/// Each variant corresponds to one externally observable failure class;
/// the HTTP layer maps them onto status codes without inspecting
/// messages.
#[derive(Error, Debug)]
pub enum CaError {
    /// Malformed or missing request fields
    #[error("invalid request: {0}")]
    Validation(String),

    /// The one-time token was rejected
    #[error("authorization failed: {0}")]
    Authorization(#[from] OttError),

    /// Authorization succeeded but the request violates token policy
    #[error("{0}")]
    Policy(String),

    /// The signer failed; indistinguishable from a policy refusal at
    /// this layer
    #[error("signing failed: {0}")]
    Signing(String),

    /// A pluggable capability is absent
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// The requested resource is empty or missing
    #[error("{0}")]
    NotFound(String),

    /// A wire blob could not be decoded
    #[error("{0}")]
    Codec(String),

    /// Database failure
    #[error("database error: {0}")]
    Database(#[from] DbError),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for CaError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Policy(msg) => CaError::Policy(msg),
            CoreError::InvalidTime(msg) => CaError::Validation(msg),
            CoreError::InvalidCsr(msg) => CaError::Validation(msg),
            CoreError::InvalidBundle(msg) => CaError::Validation(msg),
            err @ (CoreError::SshSign(_) | CoreError::X509Sign(_)) => {
                CaError::Signing(err.to_string())
            }
        }
    }
}
