//! The certificate authority assembly
//!
//! An `Authority` is built once at startup (or on graceful reload) from
//! an ordered list of configuration commands and is immutable afterwards:
//! request handling only ever reads it, so no synchronization is needed
//! on the signing path. The replay guard inside the provisioner is the
//! sole serialization point.

pub mod options;
pub mod ssh;

pub use options::AuthorityBuilder;
pub use ssh::SshSignArtifacts;

use std::sync::Arc;

use fleetca_core::options::SshCertType;
use fleetca_core::policy::SshPolicy;
use fleetca_core::{Bastion, CertificateDer, Host, SshSigner, SshTrustedKeys, X509Signer};
use fleetca_provisioner::{Authorization, AuthorizeRequest, Provisioner};

use crate::callbacks::Callbacks;
use crate::error::{CaError, Result};
use crate::kms::KeyManager;
use crate::storage::AuthDb;
use crate::templates::SshTemplates;

/// Process-wide assembly of the CA: signers, trust material, and the
/// pluggable callback surface
pub struct Authority {
    pub(crate) db: Arc<dyn AuthDb>,
    pub(crate) key_manager: Option<Arc<dyn KeyManager>>,
    pub(crate) provisioner: Option<Provisioner>,

    pub(crate) x509_signer: Option<X509Signer>,
    pub(crate) x509_roots: Vec<CertificateDer>,
    pub(crate) x509_federated: Vec<CertificateDer>,

    pub(crate) ssh_user_signer: Option<SshSigner>,
    pub(crate) ssh_host_signer: Option<SshSigner>,
    pub(crate) ssh_user_keys: Vec<ssh_key::PublicKey>,
    pub(crate) ssh_user_federated_keys: Vec<ssh_key::PublicKey>,
    pub(crate) ssh_host_keys: Vec<ssh_key::PublicKey>,
    pub(crate) ssh_host_federated_keys: Vec<ssh_key::PublicKey>,

    pub(crate) templates: Option<SshTemplates>,
    pub(crate) callbacks: Callbacks,
}

impl std::fmt::Debug for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authority")
            .field("ssh_user_keys", &self.ssh_user_keys.len())
            .field("ssh_host_keys", &self.ssh_host_keys.len())
            .field("x509_roots", &self.x509_roots.len())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

impl Authority {
    /// Start building an authority
    pub fn builder() -> AuthorityBuilder {
        AuthorityBuilder::new()
    }

    /// The database handle
    pub fn database(&self) -> &Arc<dyn AuthDb> {
        &self.db
    }

    /// The key manager handle, if one was configured
    pub fn key_manager(&self) -> Option<&Arc<dyn KeyManager>> {
        self.key_manager.as_ref()
    }

    /// Validate a one-time token and derive the sign-time policies it
    /// grants.
    ///
    /// The token-reuse-skip callback may widen the request's own skip
    /// flag; it can never narrow it. When the token carries no principal
    /// policy of its own, the identity-lookup callback supplies one from
    /// the subject's email.
    pub async fn authorize(&self, req: AuthorizeRequest<'_>) -> Result<Authorization> {
        let provisioner = self
            .provisioner
            .as_ref()
            .ok_or(CaError::NotConfigured("token provisioner"))?;

        let skip = req.skip_token_reuse
            || self
                .callbacks
                .token_reuse_skip
                .as_ref()
                .is_some_and(|cb| cb.skip(&req));

        let mut authz = provisioner
            .authorize(AuthorizeRequest {
                skip_token_reuse: skip,
                ..req
            })
            .await?;

        let has_principals = authz
            .ssh_policies
            .iter()
            .any(|p| matches!(p, SshPolicy::Principals(_)));
        if !has_principals {
            if let (Some(lookup), Some(email)) =
                (&self.callbacks.identity, authz.claims.email.clone())
            {
                let identity = lookup.lookup(provisioner.name(), &email).await?;
                if !identity.usernames.is_empty() {
                    authz
                        .ssh_policies
                        .insert(0, SshPolicy::Principals(identity.usernames));
                }
            }
        }

        Ok(authz)
    }

    /// The SSH CA public keys this authority issues under
    pub fn get_ssh_roots(&self) -> SshTrustedKeys {
        SshTrustedKeys {
            user_keys: self.ssh_user_keys.clone(),
            host_keys: self.ssh_host_keys.clone(),
        }
    }

    /// The SSH CA public keys accepted across the federation
    pub fn get_ssh_federation(&self) -> SshTrustedKeys {
        SshTrustedKeys {
            user_keys: self.ssh_user_federated_keys.clone(),
            host_keys: self.ssh_host_federated_keys.clone(),
        }
    }

    /// Whether `principal` is an SSH-enabled host
    pub async fn check_ssh_host(&self, principal: &str, token: &str) -> Result<bool> {
        match &self.callbacks.check_host {
            Some(cb) => cb.check(principal, token, &self.x509_roots).await,
            None => Err(CaError::NotConfigured("ssh check host callback")),
        }
    }

    /// The SSH-enabled hosts visible to the caller
    pub async fn get_ssh_hosts(&self, peer_certificate: Option<&[u8]>) -> Result<Vec<Host>> {
        match &self.callbacks.get_hosts {
            Some(cb) => cb.hosts(peer_certificate).await,
            None => Err(CaError::NotConfigured("ssh get hosts callback")),
        }
    }

    /// The bastion fronting `hostname` for `user`
    pub async fn get_ssh_bastion(&self, user: &str, hostname: &str) -> Result<Bastion> {
        match &self.callbacks.bastion {
            Some(cb) => cb.lookup(user, hostname).await,
            None => Err(CaError::NotConfigured("ssh bastion callback")),
        }
    }

    pub(crate) fn ssh_signer_for(&self, cert_type: SshCertType) -> Result<&SshSigner> {
        match cert_type {
            SshCertType::User => self
                .ssh_user_signer
                .as_ref()
                .ok_or(CaError::NotConfigured("ssh user certificate signing")),
            SshCertType::Host => self
                .ssh_host_signer
                .as_ref()
                .ok_or(CaError::NotConfigured("ssh host certificate signing")),
        }
    }
}
