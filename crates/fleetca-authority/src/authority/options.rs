//! The authority option protocol
//!
//! Configuration is an ordered list of commands recorded by the fluent
//! builder methods and applied one by one at `build()`. The first
//! command that fails aborts the whole build, so a half-initialized
//! authority never escapes. The builder performs no dependency analysis;
//! command order is the caller's responsibility.
//!
//! Installing an SSH signer also appends its public key to both the
//! local and the federated acceptance list: a signer the CA loads is
//! implicitly trusted. Repeated calls compose, so the signer mutators
//! are intentionally not idempotent. The root/federated certificate
//! mutators replace instead of append and are idempotent.

use std::sync::Arc;

use fleetca_core::{read_certificate_bundle, CertificateDer, SshSigner, X509Signer};
use fleetca_provisioner::Provisioner;

use super::Authority;
use crate::callbacks::{
    BastionLookup, Callbacks, HostCheck, HostEnumeration, IdentityLookup, TokenReuseSkip,
};
use crate::error::Result;
use crate::kms::KeyManager;
use crate::storage::{AuthDb, MemoryDb};
use crate::templates::SshTemplates;

enum Command {
    Database(Arc<dyn AuthDb>),
    KeyManager(Arc<dyn KeyManager>),
    Provisioner(Provisioner),
    IdentityFunc(Arc<dyn IdentityLookup>),
    SshBastionFunc(Arc<dyn BastionLookup>),
    SshGetHostsFunc(Arc<dyn HostEnumeration>),
    SshCheckHostFunc(Arc<dyn HostCheck>),
    TokenReuseSkipFunc(Arc<dyn TokenReuseSkip>),
    X509Signer(Box<X509Signer>),
    SshUserSigner(SshSigner),
    SshHostSigner(SshSigner),
    X509RootCerts(Vec<CertificateDer>),
    X509FederatedCerts(Vec<CertificateDer>),
    X509RootBundle(Vec<u8>),
    X509FederatedBundle(Vec<u8>),
    SshTemplates(SshTemplates),
}

/// Assembles an [`Authority`] from an ordered list of configuration
/// commands
#[derive(Default)]
pub struct AuthorityBuilder {
    commands: Vec<Command>,
}

impl AuthorityBuilder {
    /// Start with an empty command list
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Set an already initialized database handle. Intended for graceful
    /// reloads, where the handle outlives the authority.
    pub fn with_database(self, db: Arc<dyn AuthDb>) -> Self {
        self.push(Command::Database(db))
    }

    /// Set the key manager used to load signing keys
    pub fn with_key_manager(self, kms: Arc<dyn KeyManager>) -> Self {
        self.push(Command::KeyManager(kms))
    }

    /// Set the provisioner that validates one-time tokens
    pub fn with_provisioner(self, provisioner: Provisioner) -> Self {
        self.push(Command::Provisioner(provisioner))
    }

    /// Install a callback resolving identities from an external resource
    pub fn with_identity_func(self, f: Arc<dyn IdentityLookup>) -> Self {
        self.push(Command::IdentityFunc(f))
    }

    /// Install a callback returning the bastion for a user-host pair
    pub fn with_ssh_bastion_func(self, f: Arc<dyn BastionLookup>) -> Self {
        self.push(Command::SshBastionFunc(f))
    }

    /// Install a callback enumerating SSH-enabled hosts
    pub fn with_ssh_get_hosts_func(self, f: Arc<dyn HostEnumeration>) -> Self {
        self.push(Command::SshGetHostsFunc(f))
    }

    /// Install a callback checking whether a principal is an SSH-enabled
    /// host
    pub fn with_ssh_check_host_func(self, f: Arc<dyn HostCheck>) -> Self {
        self.push(Command::SshCheckHostFunc(f))
    }

    /// Install a callback widening the token-reuse policy
    pub fn with_token_reuse_skip_func(self, f: Arc<dyn TokenReuseSkip>) -> Self {
        self.push(Command::TokenReuseSkipFunc(f))
    }

    /// Set the X.509 issuer certificate and signer pair
    pub fn with_x509_signer(self, signer: X509Signer) -> Self {
        self.push(Command::X509Signer(Box::new(signer)))
    }

    /// Install the signer for SSH user certificates and trust its public
    /// key. Repeated calls accumulate accepted keys; the last signer
    /// installed signs.
    pub fn with_ssh_user_signer(self, signer: SshSigner) -> Self {
        self.push(Command::SshUserSigner(signer))
    }

    /// Install the signer for SSH host certificates and trust its public
    /// key. Same composition rules as [`with_ssh_user_signer`].
    ///
    /// [`with_ssh_user_signer`]: AuthorityBuilder::with_ssh_user_signer
    pub fn with_ssh_host_signer(self, signer: SshSigner) -> Self {
        self.push(Command::SshHostSigner(signer))
    }

    /// Replace the X.509 root certificates
    pub fn with_x509_root_certs(self, certs: Vec<CertificateDer>) -> Self {
        self.push(Command::X509RootCerts(certs))
    }

    /// Replace the federated X.509 certificates
    pub fn with_x509_federated_certs(self, certs: Vec<CertificateDer>) -> Self {
        self.push(Command::X509FederatedCerts(certs))
    }

    /// Replace the X.509 root certificates from a PEM bundle
    pub fn with_x509_root_bundle(self, pem: impl Into<Vec<u8>>) -> Self {
        self.push(Command::X509RootBundle(pem.into()))
    }

    /// Replace the federated X.509 certificates from a PEM bundle
    pub fn with_x509_federated_bundle(self, pem: impl Into<Vec<u8>>) -> Self {
        self.push(Command::X509FederatedBundle(pem.into()))
    }

    /// Set the SSH configuration template sets
    pub fn with_ssh_templates(self, templates: SshTemplates) -> Self {
        self.push(Command::SshTemplates(templates))
    }

    /// Apply the recorded commands in order. The first failure aborts
    /// the build.
    pub fn build(self) -> Result<Authority> {
        let mut authority = Authority {
            db: Arc::new(MemoryDb::new()),
            key_manager: None,
            provisioner: None,
            x509_signer: None,
            x509_roots: Vec::new(),
            x509_federated: Vec::new(),
            ssh_user_signer: None,
            ssh_host_signer: None,
            ssh_user_keys: Vec::new(),
            ssh_user_federated_keys: Vec::new(),
            ssh_host_keys: Vec::new(),
            ssh_host_federated_keys: Vec::new(),
            templates: None,
            callbacks: Callbacks::default(),
        };
        for command in self.commands {
            apply(&mut authority, command)?;
        }
        Ok(authority)
    }
}

fn apply(a: &mut Authority, command: Command) -> Result<()> {
    match command {
        Command::Database(db) => a.db = db,
        Command::KeyManager(kms) => a.key_manager = Some(kms),
        Command::Provisioner(p) => a.provisioner = Some(p),
        Command::IdentityFunc(f) => a.callbacks.identity = Some(f),
        Command::SshBastionFunc(f) => a.callbacks.bastion = Some(f),
        Command::SshGetHostsFunc(f) => a.callbacks.get_hosts = Some(f),
        Command::SshCheckHostFunc(f) => a.callbacks.check_host = Some(f),
        Command::TokenReuseSkipFunc(f) => a.callbacks.token_reuse_skip = Some(f),
        Command::X509Signer(signer) => a.x509_signer = Some(*signer),
        Command::SshUserSigner(signer) => {
            let public_key = signer.public_key();
            a.ssh_user_signer = Some(signer);
            a.ssh_user_keys.push(public_key.clone());
            a.ssh_user_federated_keys.push(public_key);
        }
        Command::SshHostSigner(signer) => {
            let public_key = signer.public_key();
            a.ssh_host_signer = Some(signer);
            a.ssh_host_keys.push(public_key.clone());
            a.ssh_host_federated_keys.push(public_key);
        }
        Command::X509RootCerts(certs) => a.x509_roots = certs,
        Command::X509FederatedCerts(certs) => a.x509_federated = certs,
        Command::X509RootBundle(pem) => a.x509_roots = read_certificate_bundle(&pem)?,
        Command::X509FederatedBundle(pem) => a.x509_federated = read_certificate_bundle(&pem)?,
        Command::SshTemplates(templates) => a.templates = Some(templates),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ssh_key::rand_core::OsRng;
    use ssh_key::{Algorithm, PrivateKey};

    use super::*;

    fn test_signer() -> SshSigner {
        SshSigner::new(PrivateKey::random(&mut OsRng, Algorithm::Ed25519).unwrap())
    }

    #[test]
    fn test_ssh_signers_append_to_both_lists() {
        let first = test_signer();
        let second = test_signer();
        let second_public = second.public_key();

        let authority = Authority::builder()
            .with_ssh_user_signer(first)
            .with_ssh_user_signer(second)
            .build()
            .unwrap();

        assert_eq!(authority.ssh_user_keys.len(), 2);
        assert_eq!(authority.ssh_user_federated_keys.len(), 2);
        assert_eq!(
            authority.ssh_user_signer.as_ref().unwrap().public_key(),
            second_public,
            "the last installed signer signs"
        );
        assert!(authority.ssh_host_keys.is_empty());
    }

    #[test]
    fn test_root_bundle_replaces_and_is_idempotent() {
        let key = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
        let signer = X509Signer::self_signed("Test Root", key).unwrap();
        let bundle = signer.issuer_certificate().to_pem();

        let authority = Authority::builder()
            .with_x509_root_bundle(bundle.as_bytes().to_vec())
            .with_x509_root_bundle(bundle.as_bytes().to_vec())
            .build()
            .unwrap();

        assert_eq!(authority.x509_roots.len(), 1, "bundles replace, not append");
        assert_eq!(authority.x509_roots[0], *signer.issuer_certificate());
    }

    #[test]
    fn test_malformed_bundle_aborts_build() {
        let bogus =
            pem::encode(&pem::Pem::new("CERTIFICATE", b"definitely not der".to_vec()));

        let err = Authority::builder()
            .with_ssh_user_signer(test_signer())
            .with_x509_root_bundle(bogus.into_bytes())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("certificate"));
    }

    #[test]
    fn test_empty_build_has_no_capabilities() {
        let authority = Authority::builder().build().unwrap();
        assert!(authority.ssh_user_signer.is_none());
        assert!(authority.callbacks.check_host.is_none());
        assert!(authority.get_ssh_roots().is_empty());
    }
}
