//! Wire codec for SSH certificates and public keys
//!
//! On the wire both are quoted base64 of their OpenSSH binary form;
//! JSON `null` (or an empty string, on decode) denotes absence. The
//! structured types stay in the domain; only this module knows the
//! transport convention.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ssh_encoding::{Decode, Encode};
use ssh_key::certificate::Certificate;

/// An SSH certificate in its JSON transport form
#[derive(Debug, Clone, Default)]
pub struct SshCertificate(pub Option<Certificate>);

impl From<Certificate> for SshCertificate {
    fn from(cert: Certificate) -> Self {
        Self(Some(cert))
    }
}

impl Serialize for SshCertificate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            None => serializer.serialize_none(),
            Some(cert) => {
                let mut wire = Vec::new();
                cert.encode(&mut wire).map_err(|e| {
                    serde::ser::Error::custom(format!("error encoding ssh certificate: {e}"))
                })?;
                serializer.serialize_str(&STANDARD.encode(wire))
            }
        }
    }
}

impl<'de> Deserialize<'de> for SshCertificate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value: Option<String> = Option::deserialize(deserializer)?;
        match value.as_deref() {
            None | Some("") => Ok(Self(None)),
            Some(s) => {
                let wire = STANDARD.decode(s).map_err(|e| {
                    serde::de::Error::custom(format!("error decoding ssh certificate: {e}"))
                })?;
                let mut reader = wire.as_slice();
                let cert = Certificate::decode(&mut reader).map_err(|e| {
                    serde::de::Error::custom(format!("error parsing ssh certificate: {e}"))
                })?;
                Ok(Self(Some(cert)))
            }
        }
    }
}

/// An SSH public key in its JSON transport form
#[derive(Debug, Clone, Default)]
pub struct SshPublicKey(pub Option<ssh_key::PublicKey>);

impl From<ssh_key::PublicKey> for SshPublicKey {
    fn from(key: ssh_key::PublicKey) -> Self {
        Self(Some(key))
    }
}

impl Serialize for SshPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            None => serializer.serialize_none(),
            Some(key) => {
                let wire = key.to_bytes().map_err(|e| {
                    serde::ser::Error::custom(format!("error encoding ssh public key: {e}"))
                })?;
                serializer.serialize_str(&STANDARD.encode(wire))
            }
        }
    }
}

impl<'de> Deserialize<'de> for SshPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value: Option<String> = Option::deserialize(deserializer)?;
        match value.as_deref() {
            None | Some("") => Ok(Self(None)),
            Some(s) => {
                let wire = STANDARD.decode(s).map_err(|e| {
                    serde::de::Error::custom(format!("error decoding ssh public key: {e}"))
                })?;
                let key = ssh_key::PublicKey::from_bytes(&wire).map_err(|e| {
                    serde::de::Error::custom(format!("error parsing ssh public key: {e}"))
                })?;
                Ok(Self(Some(key)))
            }
        }
    }
}
