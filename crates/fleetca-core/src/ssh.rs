//! SSH certificate signing
//!
//! `SshSigner` wraps a CA private key and turns fully resolved options
//! into a signed OpenSSH certificate. All policy decisions happen before
//! this layer; the signer only refuses inputs it cannot express.

use ssh_key::certificate::{Builder, Certificate};
use ssh_key::rand_core::OsRng;
use ssh_key::{PrivateKey, PublicKey};

use crate::error::{CoreError, Result};
use crate::policy::ResolvedSshOptions;

/// Signs OpenSSH certificates with a single CA private key
pub struct SshSigner {
    private_key: PrivateKey,
}

impl std::fmt::Debug for SshSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSigner")
            .field("public_key", &self.private_key.public_key().to_openssh())
            .finish()
    }
}

impl SshSigner {
    /// Wrap an already loaded CA private key
    pub fn new(private_key: PrivateKey) -> Self {
        Self { private_key }
    }

    /// Load a signer from an OpenSSH-format private key
    pub fn from_openssh(pem: &str) -> Result<Self> {
        Ok(Self::new(PrivateKey::from_openssh(pem)?))
    }

    /// The CA public key corresponding to this signer
    pub fn public_key(&self) -> PublicKey {
        self.private_key.public_key().clone()
    }

    /// Sign a certificate over `public_key` with the resolved options
    pub fn sign(&self, public_key: &PublicKey, opts: &ResolvedSshOptions) -> Result<Certificate> {
        if opts.principals.is_empty() {
            return Err(CoreError::Policy("certificate without principals".into()));
        }

        let mut rng = OsRng;
        let mut builder = Builder::new_with_random_nonce(
            &mut rng,
            public_key,
            opts.valid_after,
            opts.valid_before,
        )?;
        builder.cert_type(opts.cert_type.into())?;
        builder.key_id(opts.key_id.as_str())?;
        for principal in &opts.principals {
            builder.valid_principal(principal.as_str())?;
        }
        for (name, data) in &opts.critical_options {
            builder.critical_option(name.as_str(), data.as_str())?;
        }
        for (name, data) in &opts.extensions {
            builder.extension(name.as_str(), data.as_str())?;
        }

        Ok(builder.sign(&self.private_key)?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ssh_key::certificate::CertType;
    use ssh_key::Algorithm;

    use super::*;
    use crate::options::SshCertType;

    fn test_signer() -> SshSigner {
        SshSigner::new(PrivateKey::random(&mut OsRng, Algorithm::Ed25519).unwrap())
    }

    fn subject_key() -> PublicKey {
        PrivateKey::random(&mut OsRng, Algorithm::Ed25519)
            .unwrap()
            .public_key()
            .clone()
    }

    fn options(principals: &[&str]) -> ResolvedSshOptions {
        ResolvedSshOptions {
            cert_type: SshCertType::User,
            key_id: "alice@example".into(),
            principals: principals.iter().map(|s| s.to_string()).collect(),
            valid_after: 1_700_000_000,
            valid_before: 1_700_057_600,
            critical_options: BTreeMap::new(),
            extensions: BTreeMap::from([("permit-pty".to_string(), String::new())]),
        }
    }

    #[test]
    fn test_sign_user_certificate() {
        let signer = test_signer();
        let cert = signer.sign(&subject_key(), &options(&["alice"])).unwrap();

        assert_eq!(cert.cert_type(), CertType::User);
        assert_eq!(cert.key_id(), "alice@example");
        assert_eq!(cert.valid_principals(), &["alice".to_string()]);
        assert_eq!(cert.valid_after(), 1_700_000_000);
        assert_eq!(cert.valid_before(), 1_700_057_600);
        assert_eq!(
            cert.signature_key(),
            signer.public_key().key_data(),
            "certificate must be signed by the CA key"
        );
    }

    #[test]
    fn test_sign_rejects_empty_principals() {
        let signer = test_signer();
        let err = signer.sign(&subject_key(), &options(&[])).unwrap_err();
        assert!(matches!(err, CoreError::Policy(_)));
    }

    #[test]
    fn test_critical_options_are_carried() {
        let signer = test_signer();
        let mut opts = options(&["alice"]);
        opts.critical_options
            .insert("force-command".into(), "/usr/bin/true".into());

        let cert = signer.sign(&subject_key(), &opts).unwrap();
        let (name, data) = cert.critical_options().iter().next().unwrap();
        assert_eq!(name, "force-command");
        assert_eq!(data, "/usr/bin/true");
    }
}
