//! Key manager seam
//!
//! The authority obtains its signing keys through a `KeyManager` so the
//! private key material can live behind an external KMS. The shipped
//! implementation is file-backed: OpenSSH private keys for the SSH
//! signers and PKCS#8 PEM for the X.509 issuer key.

use std::path::PathBuf;

use fleetca_core::SshSigner;

use crate::error::{CaError, Result};

/// Provides signing keys by reference name
pub trait KeyManager: Send + Sync {
    /// An SSH signer for the named key
    fn ssh_signer(&self, name: &str) -> Result<SshSigner>;

    /// An X.509 key pair for the named key
    fn x509_key_pair(&self, name: &str) -> Result<rcgen::KeyPair>;
}

/// File-backed key manager.
///
/// Key names resolve to files under the configured directory.
#[derive(Debug, Clone)]
pub struct SoftKeyManager {
    dir: PathBuf,
}

impl SoftKeyManager {
    /// Create a key manager rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Whether the named key exists on disk
    pub fn has_key(&self, name: &str) -> bool {
        self.dir.join(name).is_file()
    }

    fn read(&self, name: &str) -> Result<String> {
        let path = self.dir.join(name);
        std::fs::read_to_string(&path)
            .map_err(|e| CaError::Internal(format!("error reading key {}: {e}", path.display())))
    }
}

impl KeyManager for SoftKeyManager {
    fn ssh_signer(&self, name: &str) -> Result<SshSigner> {
        let pem = self.read(name)?;
        SshSigner::from_openssh(&pem).map_err(CaError::from)
    }

    fn x509_key_pair(&self, name: &str) -> Result<rcgen::KeyPair> {
        let pem = self.read(name)?;
        rcgen::KeyPair::from_pem(&pem)
            .map_err(|e| CaError::Internal(format!("error parsing key {name}: {e}")))
    }
}
