//! Pluggable callback surface
//!
//! Deployments customize host discovery and identity resolution by
//! installing callbacks at build time. Each capability is a narrow trait
//! behind an `Option<Arc<dyn ...>>`; an absent callback produces a typed
//! not-configured error at the call site, never a default answer.

use async_trait::async_trait;
use fleetca_core::{Bastion, CertificateDer, Host, Identity};
use fleetca_provisioner::AuthorizeRequest;

use crate::error::Result;

/// Resolves a token subject's identity from an external directory
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Look up the identity for `email` as seen by `provisioner`
    async fn lookup(&self, provisioner: &str, email: &str) -> Result<Identity>;
}

/// Finds the bastion fronting a target host for a given user
#[async_trait]
pub trait BastionLookup: Send + Sync {
    /// The bastion `user` should hop through to reach `hostname`
    async fn lookup(&self, user: &str, hostname: &str) -> Result<Bastion>;
}

/// Enumerates the SSH-enabled hosts visible to a caller
#[async_trait]
pub trait HostEnumeration: Send + Sync {
    /// List hosts, optionally scoped by the caller's TLS peer
    /// certificate (DER)
    async fn hosts(&self, peer_certificate: Option<&[u8]>) -> Result<Vec<Host>>;
}

/// Checks whether a principal is an SSH-enabled host
#[async_trait]
pub trait HostCheck: Send + Sync {
    /// Whether `principal` is a known host. `token` authenticates the
    /// asking host; `roots` are the X.509 roots it can be validated
    /// against.
    async fn check(&self, principal: &str, token: &str, roots: &[CertificateDer]) -> Result<bool>;
}

/// Widens the token-reuse policy beyond the orchestrator's explicit skip
pub trait TokenReuseSkip: Send + Sync {
    /// Whether this presentation may bypass the replay check
    fn skip(&self, req: &AuthorizeRequest<'_>) -> bool;
}

/// The authority's optional capabilities, fixed at build time
#[derive(Default)]
pub struct Callbacks {
    /// External identity resolution
    pub identity: Option<std::sync::Arc<dyn IdentityLookup>>,
    /// Bastion discovery
    pub bastion: Option<std::sync::Arc<dyn BastionLookup>>,
    /// Host enumeration
    pub get_hosts: Option<std::sync::Arc<dyn HostEnumeration>>,
    /// Host membership check
    pub check_host: Option<std::sync::Arc<dyn HostCheck>>,
    /// Token-reuse widening
    pub token_reuse_skip: Option<std::sync::Arc<dyn TokenReuseSkip>>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("identity", &self.identity.is_some())
            .field("bastion", &self.bastion.is_some())
            .field("get_hosts", &self.get_hosts.is_some())
            .field("check_host", &self.check_host.is_some())
            .field("token_reuse_skip", &self.token_reuse_skip.is_some())
            .finish()
    }
}
