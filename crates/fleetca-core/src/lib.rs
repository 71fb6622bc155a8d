//! # Fleetca Core
//!
//! Core types and signing primitives for the fleetca SSH certificate
//! authority.
//!
//! ## Key Concepts
//!
//! - **SshOptions**: The caller-requested shape of an SSH certificate
//!   (type, key ID, principals, validity window)
//! - **Sign-time policies**: Ordered constraints derived from a one-time
//!   token that are applied over the requested options before signing
//! - **SshSigner / X509Signer**: The signing primitives for OpenSSH
//!   certificates and the co-issued identity X.509 certificates
//! - **Trust bundles**: PEM bundles of root and federated CA certificates
//!
//! The authority assembly, orchestration, and HTTP surface live in the
//! `fleetca-authority` crate; one-time-token validation lives in
//! `fleetca-provisioner`.

pub mod error;
pub mod options;
pub mod policy;
pub mod ssh;
pub mod types;
pub mod x509;

pub use error::{CoreError, Result};
pub use options::{SshCertType, SshOptions, TimeDuration};
pub use policy::{resolve_ssh_options, ResolvedSshOptions, SshPolicy, X509Policy};
pub use ssh::SshSigner;
pub use types::{Bastion, Host, Identity, SshTrustedKeys};
pub use x509::{
    chain_to_pem, csr_from_pem, read_certificate_bundle, verify_csr, CertificateDer, X509Signer,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
