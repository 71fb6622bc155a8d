#![allow(dead_code)]

//! Shared fixtures for the integration suites: a fully assembled
//! authority with real keys and real one-time tokens.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use fleetca_authority::{AuthDb, Authority, AuthorityBuilder, MemoryDb};
use fleetca_core::options::SshCertType;
use fleetca_core::policy::ResolvedSshOptions;
use fleetca_core::{SshSigner, X509Signer};
use fleetca_provisioner::{OttClaims, Provisioner};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use ssh_key::certificate::Certificate;
use ssh_key::rand_core::OsRng;
use ssh_key::{PrivateKey, PublicKey};

pub const OTT_SECRET: &[u8] = b"integration-test-secret";
pub const AUDIENCE: &str = "https://ca.fleet.internal";

pub fn keypair() -> PrivateKey {
    PrivateKey::random(&mut OsRng, ssh_key::Algorithm::Ed25519).unwrap()
}

pub fn public_key() -> PublicKey {
    keypair().public_key().clone()
}

pub fn provisioner() -> Provisioner {
    Provisioner::new(
        "fleetca",
        AUDIENCE,
        DecodingKey::from_secret(OTT_SECRET),
        Algorithm::HS256,
    )
}

pub fn x509_signer() -> X509Signer {
    let key = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
    X509Signer::self_signed("Fleetca Identity CA", key).unwrap()
}

/// An authority with user, host, and identity signers plus a database
pub fn builder() -> (AuthorityBuilder, Arc<dyn AuthDb>) {
    let db: Arc<dyn AuthDb> = Arc::new(MemoryDb::new());
    let builder = Authority::builder()
        .with_database(db.clone())
        .with_provisioner(provisioner())
        .with_ssh_user_signer(SshSigner::new(keypair()))
        .with_ssh_host_signer(SshSigner::new(keypair()))
        .with_x509_signer(x509_signer());
    (builder, db)
}

pub fn authority() -> Authority {
    builder().0.build().unwrap()
}

pub fn claims(jti: &str, principals: &[&str]) -> OttClaims {
    OttClaims {
        iss: "enrolld".into(),
        sub: "alice".into(),
        aud: AUDIENCE.into(),
        exp: Utc::now().timestamp() + 300,
        iat: Utc::now().timestamp(),
        nbf: None,
        jti: jti.into(),
        principals: principals.iter().map(|s| s.to_string()).collect(),
        cert_type: Some("user".into()),
        key_id: None,
        email: Some("alice@example.com".into()),
        validity: None,
    }
}

pub fn mint(claims: &OttClaims) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(OTT_SECRET),
    )
    .unwrap()
}

pub fn user_token(jti: &str, principals: &[&str]) -> String {
    mint(&claims(jti, principals))
}

/// A certificate signed by an attacker's own key rather than any CA
/// this authority trusts, claiming whatever principal it likes
pub fn forged_user_certificate(principal: &str) -> Certificate {
    let attacker_ca = SshSigner::new(keypair());
    let now = Utc::now().timestamp().max(0) as u64;
    attacker_ca
        .sign(
            &public_key(),
            &ResolvedSshOptions {
                cert_type: SshCertType::User,
                key_id: format!("{principal}@forged"),
                principals: vec![principal.into()],
                valid_after: now - 60,
                valid_before: now + 3600,
                critical_options: BTreeMap::new(),
                extensions: BTreeMap::new(),
            },
        )
        .unwrap()
}

/// A PEM-encoded CSR with the given common name, self-signed by a fresh
/// key
pub fn csr_pem(common_name: &str) -> String {
    let key = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap();
    let mut params = rcgen::CertificateParams::new(Vec::new()).unwrap();
    let mut dn = rcgen::DistinguishedName::new();
    dn.push(rcgen::DnType::CommonName, common_name);
    params.distinguished_name = dn;
    params.serialize_request(&key).unwrap().pem().unwrap()
}
