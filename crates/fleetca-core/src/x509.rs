//! X.509 issuance for co-issued identity certificates
//!
//! The identity certificate is signed from a caller-supplied PKCS#10
//! request. The CSR's self-signature is checked during request
//! validation (`verify_csr`), and the issued certificate's validity is
//! controlled by the ordered `X509Policy` list, where a `Lifetime` entry
//! overwrites both endpoints.
//!
//! Trust anchors are carried as DER blobs (`CertificateDer`); PEM
//! bundles accept only header-less `CERTIFICATE` blocks.

use rcgen::{
    BasicConstraints, CertificateParams, CertificateSigningRequestParams, DistinguishedName,
    DnType, ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose,
};
use time::OffsetDateTime;
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::prelude::FromDer;

use crate::error::{CoreError, Result};
use crate::policy::X509Policy;

/// A DER-encoded X.509 certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDer(Vec<u8>);

impl CertificateDer {
    /// Wrap DER bytes
    pub fn from_der(der: Vec<u8>) -> Self {
        Self(der)
    }

    /// The DER bytes
    pub fn der(&self) -> &[u8] {
        &self.0
    }

    /// PEM-encode the certificate
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new("CERTIFICATE", self.0.clone()))
    }
}

/// Parse a PEM trust bundle into its certificates, preserving order.
///
/// Only blocks typed `CERTIFICATE` with no PEM headers are trust
/// anchors; other blocks are skipped. A block that fails to parse as a
/// DER certificate aborts the whole bundle.
pub fn read_certificate_bundle(bundle: &[u8]) -> Result<Vec<CertificateDer>> {
    let blocks = pem::parse_many(bundle)
        .map_err(|e| CoreError::InvalidBundle(format!("error decoding pem bundle: {e}")))?;

    let mut certs = Vec::new();
    for block in blocks {
        if block.tag() != "CERTIFICATE" || block.headers().iter().next().is_some() {
            continue;
        }
        x509_parser::parse_x509_certificate(block.contents())
            .map_err(|e| CoreError::InvalidBundle(format!("error parsing certificate: {e}")))?;
        certs.push(CertificateDer::from_der(block.contents().to_vec()));
    }
    Ok(certs)
}

/// Extract the DER bytes of a PEM-encoded PKCS#10 request
pub fn csr_from_pem(pem_str: &str) -> Result<Vec<u8>> {
    let block = pem::parse(pem_str)
        .map_err(|e| CoreError::InvalidCsr(format!("error decoding identityCSR: {e}")))?;
    match block.tag() {
        "CERTIFICATE REQUEST" | "NEW CERTIFICATE REQUEST" => Ok(block.into_contents()),
        tag => Err(CoreError::InvalidCsr(format!(
            "unexpected pem block {tag}, expected CERTIFICATE REQUEST"
        ))),
    }
}

/// Verify the self-signature of a DER-encoded PKCS#10 request
pub fn verify_csr(csr_der: &[u8]) -> Result<()> {
    let (_, csr) = X509CertificationRequest::from_der(csr_der)
        .map_err(|e| CoreError::InvalidCsr(format!("error parsing identityCSR: {e}")))?;
    csr.verify_signature()
        .map_err(|e| CoreError::InvalidCsr(format!("invalid identityCSR signature: {e}")))
}

/// Signs identity X.509 certificates with the authority's issuer key
pub struct X509Signer {
    issuer_params: CertificateParams,
    issuer_key: KeyPair,
    issuer_cert: CertificateDer,
}

impl std::fmt::Debug for X509Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X509Signer")
            .field("issuer", &self.issuer_params.distinguished_name)
            .finish()
    }
}

impl X509Signer {
    /// Create an issuer from explicit parts: the issuer certificate, the
    /// parameters it was built from, and its signing key
    pub fn new(issuer_cert: CertificateDer, issuer_params: CertificateParams, key: KeyPair) -> Self {
        Self {
            issuer_params,
            issuer_key: key,
            issuer_cert,
        }
    }

    /// Generate a self-signed issuer, for deployments without an external
    /// X.509 hierarchy
    pub fn self_signed(common_name: &str, key: KeyPair) -> Result<Self> {
        let mut params = CertificateParams::new(Vec::new())?;
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        params.distinguished_name = dn;

        let now = OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + time::Duration::days(3650);
        params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];

        let cert = params.clone().self_signed(&key)?;
        Ok(Self {
            issuer_params: params,
            issuer_key: key,
            issuer_cert: CertificateDer::from_der(cert.der().to_vec()),
        })
    }

    /// The issuer certificate appended to every signed chain
    pub fn issuer_certificate(&self) -> &CertificateDer {
        &self.issuer_cert
    }

    /// Sign a leaf certificate from a DER-encoded PKCS#10 request,
    /// applying the policies in order. Returns the chain leaf first.
    pub fn sign_csr(&self, csr_der: &[u8], policies: &[X509Policy]) -> Result<Vec<CertificateDer>> {
        let mut csr = CertificateSigningRequestParams::from_der(&csr_der.to_vec().into())
            .map_err(|e| CoreError::InvalidCsr(format!("error parsing identityCSR: {e}")))?;

        let now = OffsetDateTime::now_utc();
        csr.params.not_before = now;
        csr.params.not_after = now + time::Duration::hours(24);
        csr.params.is_ca = IsCa::NoCa;
        csr.params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        csr.params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ClientAuth,
            ExtendedKeyUsagePurpose::ServerAuth,
        ];

        for policy in policies {
            match policy {
                X509Policy::CommonName(cn) => {
                    let mut dn = DistinguishedName::new();
                    dn.push(DnType::CommonName, cn.as_str());
                    csr.params.distinguished_name = dn;
                }
                X509Policy::Validity(d) => {
                    csr.params.not_after =
                        csr.params.not_before + time::Duration::seconds(d.num_seconds());
                }
                X509Policy::Lifetime {
                    not_before,
                    not_after,
                } => {
                    csr.params.not_before = OffsetDateTime::from_unix_timestamp(*not_before)
                        .map_err(|e| CoreError::InvalidTime(e.to_string()))?;
                    csr.params.not_after = OffsetDateTime::from_unix_timestamp(*not_after)
                        .map_err(|e| CoreError::InvalidTime(e.to_string()))?;
                }
            }
        }

        let issuer = Issuer::from_params(&self.issuer_params, &self.issuer_key);
        let leaf = csr.signed_by(&issuer)?;

        Ok(vec![
            CertificateDer::from_der(leaf.der().to_vec()),
            self.issuer_cert.clone(),
        ])
    }
}

/// PEM-encode a chain, preserving order
pub fn chain_to_pem(chain: &[CertificateDer]) -> Vec<String> {
    chain.iter().map(CertificateDer::to_pem).collect()
}
