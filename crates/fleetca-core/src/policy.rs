//! Sign-time policies
//!
//! Authorization produces an ordered list of policies derived from the
//! one-time token. `resolve_ssh_options` folds them over the caller's
//! requested options to produce the final, fully determined certificate
//! fields handed to the signer. X.509 policies are applied by the
//! identity signer in order; a `Lifetime` entry overwrites both validity
//! endpoints, so appending it last makes it win over every other policy.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, Result};
use crate::options::{SshCertType, SshOptions};

/// Extensions granted to user certificates when no policy overrides them
const DEFAULT_USER_EXTENSIONS: [&str; 5] = [
    "permit-X11-forwarding",
    "permit-agent-forwarding",
    "permit-port-forwarding",
    "permit-pty",
    "permit-user-rc",
];

/// A token-derived constraint on an SSH certificate
#[derive(Debug, Clone)]
pub enum SshPolicy {
    /// The token only authorizes this certificate type
    CertType(SshCertType),
    /// The principals the token authorizes; requests must be a subset,
    /// and an empty request inherits the whole list
    Principals(Vec<String>),
    /// Key ID to use when the request leaves it empty
    KeyId(String),
    /// Default validity per certificate type when the request is open-ended
    ValidityDefaults {
        /// Default duration for user certificates
        user: Duration,
        /// Default duration for host certificates
        host: Duration,
    },
    /// Upper bound on the validity window
    ValidityCap(Duration),
    /// Extensions replacing the built-in user defaults
    Extensions(BTreeMap<String, String>),
}

/// A token-derived constraint on a co-issued X.509 certificate
#[derive(Debug, Clone)]
pub enum X509Policy {
    /// Override the subject common name
    CommonName(String),
    /// Lifetime from signing time
    Validity(Duration),
    /// Force both validity endpoints (Unix seconds). Wins over any policy
    /// applied before it.
    Lifetime {
        /// Forced notBefore
        not_before: i64,
        /// Forced notAfter
        not_after: i64,
    },
}

/// Fully determined certificate fields, ready for the signer
#[derive(Debug, Clone)]
pub struct ResolvedSshOptions {
    /// Certificate type
    pub cert_type: SshCertType,
    /// Key ID
    pub key_id: String,
    /// Valid principals, in request order
    pub principals: Vec<String>,
    /// Start of validity (Unix seconds)
    pub valid_after: u64,
    /// End of validity (Unix seconds)
    pub valid_before: u64,
    /// Critical options
    pub critical_options: BTreeMap<String, String>,
    /// Extensions
    pub extensions: BTreeMap<String, String>,
}

/// Fold the token-derived policies over the requested options.
///
/// Policies are applied in order; a later policy of the same kind
/// overrides an earlier one. Conflicts between the request and a policy
/// are policy violations, not silent rewrites.
pub fn resolve_ssh_options(
    req: &SshOptions,
    policies: &[SshPolicy],
    now: DateTime<Utc>,
) -> Result<ResolvedSshOptions> {
    let mut pinned_type: Option<SshCertType> = None;
    let mut allowed_principals: Option<&[String]> = None;
    let mut default_key_id: Option<&str> = None;
    let mut default_user = Duration::hours(16);
    let mut default_host = Duration::hours(720);
    let mut cap: Option<Duration> = None;
    let mut extensions_override: Option<&BTreeMap<String, String>> = None;

    for policy in policies {
        match policy {
            SshPolicy::CertType(t) => pinned_type = Some(*t),
            SshPolicy::Principals(p) => allowed_principals = Some(p),
            SshPolicy::KeyId(id) => default_key_id = Some(id),
            SshPolicy::ValidityDefaults { user, host } => {
                default_user = *user;
                default_host = *host;
            }
            SshPolicy::ValidityCap(d) => cap = Some(*d),
            SshPolicy::Extensions(e) => extensions_override = Some(e),
        }
    }

    let cert_type = match (req.cert_type, pinned_type) {
        (Some(requested), Some(pinned)) if requested != pinned => {
            return Err(CoreError::Policy(format!(
                "token does not authorize {requested} certificates"
            )));
        }
        (Some(requested), _) => requested,
        (None, Some(pinned)) => pinned,
        (None, None) => SshCertType::User,
    };

    let principals = if req.principals.is_empty() {
        allowed_principals.map(<[String]>::to_vec).unwrap_or_default()
    } else {
        if let Some(allowed) = allowed_principals {
            for p in &req.principals {
                if !allowed.contains(p) {
                    return Err(CoreError::Policy(format!(
                        "principal {p} is not authorized by the token"
                    )));
                }
            }
        }
        req.principals.clone()
    };
    if principals.is_empty() {
        return Err(CoreError::Policy("certificate without principals".into()));
    }

    let key_id = if req.key_id.is_empty() {
        default_key_id
            .map(str::to_owned)
            .ok_or_else(|| CoreError::Policy("missing keyID".into()))?
    } else {
        req.key_id.clone()
    };

    let default_validity = match cert_type {
        SshCertType::User => default_user,
        SshCertType::Host => default_host,
    };
    let valid_after = req.valid_after.resolve(now).unwrap_or(now);
    let valid_before = req
        .valid_before
        .resolve(now)
        .unwrap_or(valid_after + default_validity);
    if valid_before <= valid_after {
        return Err(CoreError::Policy(
            "certificate validity window is empty".into(),
        ));
    }
    if let Some(cap) = cap {
        if valid_before - valid_after > cap {
            return Err(CoreError::Policy(format!(
                "requested validity exceeds the maximum of {}s",
                cap.num_seconds()
            )));
        }
    }

    let extensions = match (extensions_override, cert_type) {
        (Some(e), _) => e.clone(),
        (None, SshCertType::User) => DEFAULT_USER_EXTENSIONS
            .iter()
            .map(|name| (name.to_string(), String::new()))
            .collect(),
        (None, SshCertType::Host) => BTreeMap::new(),
    };

    Ok(ResolvedSshOptions {
        cert_type,
        key_id,
        principals,
        valid_after: valid_after.timestamp().max(0) as u64,
        valid_before: valid_before.timestamp().max(0) as u64,
        critical_options: BTreeMap::new(),
        extensions,
    })
}
