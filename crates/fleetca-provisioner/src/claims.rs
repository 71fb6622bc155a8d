//! One-time-token claims
//!
//! An OTT is a short-lived JWT minted by the enrollment tooling. Beyond
//! the registered claims it carries the certificate policy the token
//! grants: the principals the subject may request, an optional pinned
//! certificate type, a default key ID, and an optional validity override.

use std::time::Duration;

use chrono::Utc;
use fleetca_core::options::SshCertType;
use serde::{Deserialize, Serialize};

use crate::error::{OttError, Result};

/// Claims carried by a one-time token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OttClaims {
    /// Issuer - the enrollment service that minted the token
    pub iss: String,
    /// Subject - the entity the certificate is for
    pub sub: String,
    /// Audience - the authority this token is addressed to
    pub aud: String,
    /// Expiration time (seconds since epoch)
    pub exp: i64,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Not before (optional, seconds since epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    /// Token ID; the unit of replay protection
    #[serde(default)]
    pub jti: String,

    /// Principals the token authorizes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub principals: Vec<String>,

    /// Pinned certificate type ("user" or "host"), if any
    #[serde(rename = "certType", default, skip_serializing_if = "Option::is_none")]
    pub cert_type: Option<String>,

    /// Key ID to use when the request leaves it empty
    #[serde(rename = "keyID", default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,

    /// Subject email, used for external identity lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Validity override as a relative duration string (e.g. `"8h"`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<String>,
}

impl OttClaims {
    /// The pinned certificate type, parsed
    pub fn pinned_cert_type(&self) -> Result<Option<SshCertType>> {
        match self.cert_type.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => s
                .parse()
                .map(Some)
                .map_err(|_| OttError::ValidationFailed(format!("unknown certType {s}"))),
        }
    }

    /// Time remaining until the token expires, zero if already past.
    ///
    /// Used as the TTL of the replay-guard entry: once the token has
    /// expired on its own, tracking its `jti` buys nothing.
    pub fn remaining_lifetime(&self) -> Duration {
        let remaining = self.exp - Utc::now().timestamp();
        Duration::from_secs(remaining.max(0) as u64)
    }
}
