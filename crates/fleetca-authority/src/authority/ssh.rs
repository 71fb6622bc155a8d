//! The SSH signing orchestrator
//!
//! One operation per API verb. `sign_ssh` is the interesting one: it
//! runs authorize → sign → conditional add-user issuance → conditional
//! identity co-issuance as a strict sequence, and nothing is returned
//! unless every requested artifact was signed.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use fleetca_core::options::{SshCertType, SshOptions};
use fleetca_core::policy::{resolve_ssh_options, ResolvedSshOptions, X509Policy};
use fleetca_core::CertificateDer;
use fleetca_provisioner::{AuthorizeRequest, SignMethod};
use ssh_key::certificate::{CertType, Certificate};
use ssh_key::{Fingerprint, HashAlg, PublicKey};
use tracing::info;

use super::Authority;
use crate::error::{CaError, Result};
use crate::templates::Output;

/// Everything issued by one successful sign request
#[derive(Debug)]
pub struct SshSignArtifacts {
    /// The SSH certificate
    pub certificate: Certificate,
    /// The companion add-user certificate, when its preconditions held
    pub add_user_certificate: Option<Certificate>,
    /// The identity X.509 chain, leaf first, when a CSR was supplied
    pub identity_chain: Option<Vec<CertificateDer>>,
}

impl Authority {
    /// Sign an SSH certificate authorized by a one-time token.
    ///
    /// When `add_user_key` is present, the signed certificate is
    /// user-type, and it carries exactly one principal, a companion
    /// add-user certificate is issued over that key; any precondition
    /// failing suppresses the companion without error.
    ///
    /// When `identity_csr` is present the token is re-authorized once
    /// with the replay check skipped, and the resulting X.509
    /// certificate's lifetime is forced to match the SSH certificate's.
    pub async fn sign_ssh(
        &self,
        public_key: &PublicKey,
        opts: &SshOptions,
        ott: &str,
        add_user_key: Option<&PublicKey>,
        identity_csr: Option<&[u8]>,
    ) -> Result<SshSignArtifacts> {
        let authz = self
            .authorize(AuthorizeRequest {
                ott,
                method: SignMethod::SshSign,
                skip_token_reuse: false,
            })
            .await?;

        let resolved = resolve_ssh_options(opts, &authz.ssh_policies, Utc::now())?;
        let signer = self.ssh_signer_for(resolved.cert_type)?;
        let certificate = signer.sign(public_key, &resolved)?;

        let add_user_certificate = match add_user_key {
            Some(key)
                if certificate.cert_type() == CertType::User
                    && certificate.valid_principals().len() == 1 =>
            {
                Some(self.sign_ssh_add_user(key, &certificate)?)
            }
            _ => None,
        };

        let identity_chain = match identity_csr {
            Some(csr_der) => {
                let authz = self
                    .authorize(AuthorizeRequest {
                        ott,
                        method: SignMethod::X509Sign,
                        skip_token_reuse: true,
                    })
                    .await?;
                let x509_signer = self
                    .x509_signer
                    .as_ref()
                    .ok_or(CaError::NotConfigured("x509 certificate signing"))?;

                let mut policies = authz.x509_policies;
                // Appended last so it wins over any other lifetime
                // decision: the identity certificate mirrors the ssh
                // certificate exactly.
                policies.push(X509Policy::Lifetime {
                    not_before: certificate.valid_after() as i64,
                    not_after: certificate.valid_before() as i64,
                });
                Some(x509_signer.sign_csr(csr_der, &policies)?)
            }
            None => None,
        };

        info!(
            key_id = %certificate.key_id(),
            cert_type = %resolved.cert_type,
            principals = ?certificate.valid_principals(),
            provisioner = %authz.provisioner,
            add_user = add_user_certificate.is_some(),
            identity = identity_chain.is_some(),
            "issued ssh certificate"
        );

        Ok(SshSignArtifacts {
            certificate,
            add_user_certificate,
            identity_chain,
        })
    }

    /// Issue the companion certificate that provisions a user account
    /// for the certificate's single principal
    pub fn sign_ssh_add_user(
        &self,
        public_key: &PublicKey,
        cert: &Certificate,
    ) -> Result<Certificate> {
        let signer = self
            .ssh_user_signer
            .as_ref()
            .ok_or(CaError::NotConfigured("ssh user certificate signing"))?;
        let principal = cert
            .valid_principals()
            .first()
            .ok_or_else(|| CaError::Policy("certificate has no principals".into()))?
            .clone();

        let resolved = ResolvedSshOptions {
            cert_type: SshCertType::User,
            key_id: format!("{}-addUser", cert.key_id()),
            principals: vec![principal.clone()],
            valid_after: cert.valid_after(),
            valid_before: cert.valid_before(),
            critical_options: BTreeMap::from([(
                "force-command".to_string(),
                format!("sudo useradd -m {principal}; nc -q0 localhost 22"),
            )]),
            extensions: BTreeMap::new(),
        };
        Ok(signer.sign(public_key, &resolved)?)
    }

    /// Re-sign a certificate over its own key with a fresh window of the
    /// original duration.
    ///
    /// Gated by transport authentication, not a token; the presented
    /// certificate must itself verify against this authority's CA keys
    /// and still be valid.
    pub fn renew_ssh(&self, cert: &Certificate) -> Result<Certificate> {
        let public_key = PublicKey::from(cert.public_key().clone());
        self.resign(cert, &public_key)
    }

    /// Re-sign a certificate's identity over a new public key with a
    /// fresh window.
    ///
    /// Same trust requirements as [`renew_ssh`](Authority::renew_ssh).
    pub fn rekey_ssh(&self, cert: &Certificate, public_key: &PublicKey) -> Result<Certificate> {
        self.resign(cert, public_key)
    }

    fn resign(&self, cert: &Certificate, public_key: &PublicKey) -> Result<Certificate> {
        let cert_type = match cert.cert_type() {
            CertType::User => SshCertType::User,
            CertType::Host => SshCertType::Host,
        };
        let now = Utc::now().timestamp().max(0) as u64;

        // The presented certificate is the caller's only credential here,
        // and its fields are about to be copied into a freshly CA-signed
        // certificate. Accept it only if its signature verifies against
        // one of this authority's own CA keys and it is still within its
        // validity window; anything else is an attempt to mint authority
        // out of thin air.
        let trusted = match cert_type {
            SshCertType::User => &self.ssh_user_keys,
            SshCertType::Host => &self.ssh_host_keys,
        };
        let ca_fingerprints: Vec<Fingerprint> = trusted
            .iter()
            .map(|key| key.fingerprint(HashAlg::Sha256))
            .collect();
        cert.validate_at(now, ca_fingerprints.iter()).map_err(|e| {
            CaError::Validation(format!("certificate is not trusted by this authority: {e}"))
        })?;

        let signer = self.ssh_signer_for(cert_type)?;

        if cert.valid_before() <= cert.valid_after() {
            return Err(CaError::Policy(
                "certificate has an empty validity window".into(),
            ));
        }
        let duration = cert.valid_before() - cert.valid_after();

        let resolved = ResolvedSshOptions {
            cert_type,
            key_id: cert.key_id().to_string(),
            principals: cert.valid_principals().to_vec(),
            valid_after: now,
            valid_before: now + duration,
            critical_options: cert
                .critical_options()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            extensions: cert
                .extensions()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        Ok(signer.sign(public_key, &resolved)?)
    }

    /// Render the configured SSH templates of the given type against the
    /// request's data map
    pub fn get_ssh_config(
        &self,
        cert_type: SshCertType,
        data: &HashMap<String, String>,
    ) -> Result<Vec<Output>> {
        let templates = self
            .templates
            .as_ref()
            .ok_or(CaError::NotConfigured("ssh templates"))?;
        let set = match cert_type {
            SshCertType::User => &templates.user,
            SshCertType::Host => &templates.host,
        };
        Ok(set.iter().map(|t| t.render(data)).collect())
    }
}
