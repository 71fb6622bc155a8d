//! Request and response contracts
//!
//! Every request record carries a `validate()` run before any
//! cryptographic work; validation failures surface as client errors and
//! never reach the orchestrator. Binary fields use base64 strings, SSH
//! material uses the codec wrappers, and the identity CSR travels as a
//! PEM-encoded PKCS#10 block.

use std::collections::HashMap;

use fleetca_core::options::{SshCertType, SshOptions, TimeDuration};
use fleetca_core::{csr_from_pem, verify_csr, Bastion, Host};
use serde::{Deserialize, Serialize};

use super::codec::{SshCertificate, SshPublicKey};
use crate::error::{CaError, Result};
use crate::templates::Output;

mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

mod b64_opt {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            None => serializer.serialize_none(),
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        match s.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => STANDARD.decode(s).map(Some).map_err(serde::de::Error::custom),
        }
    }
}

/// Request body of `POST /ssh/sign`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshSignRequest {
    /// OpenSSH wire bytes of the key to certify, base64-transported
    #[serde(with = "b64", default)]
    pub public_key: Vec<u8>,

    /// One-time token authorizing the request
    #[serde(default)]
    pub ott: String,

    /// Requested certificate type: empty, `"user"`, or `"host"`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cert_type: String,

    /// Requested principals
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub principals: Vec<String>,

    /// Start of the requested validity window
    #[serde(default, skip_serializing_if = "TimeDuration::is_unset")]
    pub valid_after: TimeDuration,

    /// End of the requested validity window
    #[serde(default, skip_serializing_if = "TimeDuration::is_unset")]
    pub valid_before: TimeDuration,

    /// Key to certify in the companion add-user certificate
    #[serde(with = "b64_opt", default, skip_serializing_if = "Option::is_none")]
    pub add_user_public_key: Option<Vec<u8>>,

    /// Key ID recorded in the certificate
    #[serde(rename = "keyID", default)]
    pub key_id: String,

    /// PEM-encoded PKCS#10 request for the co-issued identity
    /// certificate
    #[serde(rename = "identityCSR", default, skip_serializing_if = "Option::is_none")]
    pub identity_csr: Option<String>,
}

impl SshSignRequest {
    /// Reject malformed input before any cryptographic work
    pub fn validate(&self) -> Result<()> {
        if !self.cert_type.is_empty() && self.cert_type.parse::<SshCertType>().is_err() {
            return Err(CaError::Validation(format!(
                "unknown certType {}",
                self.cert_type
            )));
        }
        if self.public_key.is_empty() {
            return Err(CaError::Validation("missing or empty publicKey".into()));
        }
        if self.ott.is_empty() {
            return Err(CaError::Validation("missing or empty ott".into()));
        }
        if let Some(csr) = &self.identity_csr {
            let der = csr_from_pem(csr)?;
            verify_csr(&der)?;
        }
        Ok(())
    }

    /// The identity CSR as DER, if present
    pub fn identity_csr_der(&self) -> Result<Option<Vec<u8>>> {
        self.identity_csr
            .as_deref()
            .map(|csr| csr_from_pem(csr).map_err(CaError::from))
            .transpose()
    }

    /// The requested options, handed to the orchestrator
    pub fn options(&self) -> Result<SshOptions> {
        let cert_type = if self.cert_type.is_empty() {
            None
        } else {
            Some(self.cert_type.parse()?)
        };
        Ok(SshOptions {
            cert_type,
            key_id: self.key_id.clone(),
            principals: self.principals.clone(),
            valid_after: self.valid_after,
            valid_before: self.valid_before,
        })
    }
}

/// Response body of `POST /ssh/sign`
#[derive(Debug, Serialize, Deserialize)]
pub struct SshSignResponse {
    /// The SSH certificate
    #[serde(rename = "crt")]
    pub certificate: SshCertificate,

    /// The companion add-user certificate, if issued
    #[serde(rename = "addUserCrt", default, skip_serializing_if = "Option::is_none")]
    pub add_user_certificate: Option<SshCertificate>,

    /// The identity chain as PEM, leaf first, if issued
    #[serde(rename = "identityCrt", default, skip_serializing_if = "Option::is_none")]
    pub identity_certificate: Option<Vec<String>>,
}

/// Request body of `POST /ssh/renew`
#[derive(Debug, Serialize, Deserialize)]
pub struct SshRenewRequest {
    /// The certificate to renew
    #[serde(rename = "crt", default)]
    pub certificate: SshCertificate,
}

impl SshRenewRequest {
    /// Reject requests without a certificate
    pub fn validate(&self) -> Result<()> {
        if self.certificate.0.is_none() {
            return Err(CaError::Validation("missing or empty crt".into()));
        }
        Ok(())
    }
}

/// Request body of `POST /ssh/rekey`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshRekeyRequest {
    /// The certificate to rekey
    #[serde(rename = "crt", default)]
    pub certificate: SshCertificate,

    /// OpenSSH wire bytes of the new key, base64-transported
    #[serde(with = "b64", default)]
    pub public_key: Vec<u8>,
}

impl SshRekeyRequest {
    /// Reject requests without a certificate or a new key
    pub fn validate(&self) -> Result<()> {
        if self.certificate.0.is_none() {
            return Err(CaError::Validation("missing or empty crt".into()));
        }
        if self.public_key.is_empty() {
            return Err(CaError::Validation("missing or empty publicKey".into()));
        }
        Ok(())
    }
}

/// Response body of the roots and federation queries
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SshRootsResponse {
    /// Accepted user CA public keys
    #[serde(rename = "userKey", default, skip_serializing_if = "Vec::is_empty")]
    pub user_keys: Vec<SshPublicKey>,

    /// Accepted host CA public keys
    #[serde(rename = "hostKey", default, skip_serializing_if = "Vec::is_empty")]
    pub host_keys: Vec<SshPublicKey>,
}

/// Request body of `POST /ssh/config`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SshConfigRequest {
    /// Template set to render: empty defaults to `"user"`
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Opaque values substituted into the templates
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl SshConfigRequest {
    /// The requested certificate type; empty defaults to user
    pub fn cert_type(&self) -> Result<SshCertType> {
        match self.kind.as_str() {
            "" => Ok(SshCertType::User),
            "user" => Ok(SshCertType::User),
            "host" => Ok(SshCertType::Host),
            other => Err(CaError::Validation(format!("unsupported type {other}"))),
        }
    }

    /// Reject unsupported types
    pub fn validate(&self) -> Result<()> {
        self.cert_type().map(|_| ())
    }
}

/// Response body of `POST /ssh/config`
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfigResponse {
    /// Rendered templates for user-type requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_templates: Option<Vec<Output>>,

    /// Rendered templates for host-type requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_templates: Option<Vec<Output>>,
}

/// Request body of `POST /ssh/check-host`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SshCheckPrincipalRequest {
    /// Certificate type; only `"host"` is supported
    #[serde(rename = "type", default)]
    pub kind: String,

    /// The principal to check
    #[serde(default)]
    pub principal: String,

    /// Token authenticating the asking host
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
}

impl SshCheckPrincipalRequest {
    /// Reject non-host types and empty principals
    pub fn validate(&self) -> Result<()> {
        if self.kind != "host" {
            return Err(CaError::Validation(format!(
                "unsupported type {}",
                self.kind
            )));
        }
        if self.principal.is_empty() {
            return Err(CaError::Validation("missing or empty principal".into()));
        }
        Ok(())
    }
}

/// Response body of `POST /ssh/check-host`
#[derive(Debug, Serialize, Deserialize)]
pub struct SshCheckPrincipalResponse {
    /// Whether a certificate exists for the principal
    pub exists: bool,
}

/// Response body of `GET /ssh/hosts`
#[derive(Debug, Serialize, Deserialize)]
pub struct SshGetHostsResponse {
    /// The SSH-enabled hosts visible to the caller
    pub hosts: Vec<Host>,
}

/// Request body of `POST /ssh/bastion`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SshBastionRequest {
    /// The connecting user
    #[serde(default)]
    pub user: String,

    /// The target host
    #[serde(default)]
    pub hostname: String,
}

impl SshBastionRequest {
    /// Reject requests without a hostname
    pub fn validate(&self) -> Result<()> {
        if self.hostname.is_empty() {
            return Err(CaError::Validation("missing or empty hostname".into()));
        }
        Ok(())
    }
}

/// Response body of `POST /ssh/bastion`
#[derive(Debug, Serialize, Deserialize)]
pub struct SshBastionResponse {
    /// The hostname asked about
    pub hostname: String,

    /// The bastion fronting it, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bastion: Option<Bastion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_request() -> SshSignRequest {
        SshSignRequest {
            public_key: vec![1, 2, 3],
            ott: "token".into(),
            cert_type: "user".into(),
            principals: vec!["alice".into()],
            valid_after: TimeDuration::Unset,
            valid_before: TimeDuration::Unset,
            add_user_public_key: None,
            key_id: "alice@example".into(),
            identity_csr: None,
        }
    }

    #[test]
    fn test_sign_request_validation() {
        sign_request().validate().unwrap();

        let mut bad = sign_request();
        bad.cert_type = "server".into();
        assert!(bad.validate().unwrap_err().to_string().contains("certType"));

        let mut bad = sign_request();
        bad.public_key.clear();
        assert!(bad.validate().unwrap_err().to_string().contains("publicKey"));

        let mut bad = sign_request();
        bad.ott.clear();
        assert!(bad.validate().unwrap_err().to_string().contains("ott"));

        let mut bad = sign_request();
        bad.identity_csr = Some("not pem at all".into());
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_sign_request_field_names() {
        let json = r#"{
            "publicKey": "AQID",
            "ott": "token",
            "certType": "user",
            "principals": ["alice"],
            "validAfter": "",
            "validBefore": "5m",
            "keyID": "alice@example"
        }"#;
        let req: SshSignRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.public_key, vec![1, 2, 3]);
        assert_eq!(req.key_id, "alice@example");
        assert!(req.valid_after.is_unset());
        assert!(!req.valid_before.is_unset());
        assert!(req.add_user_public_key.is_none());
    }

    #[test]
    fn test_config_request_defaults_to_user() {
        let req = SshConfigRequest::default();
        assert_eq!(req.cert_type().unwrap(), SshCertType::User);

        let bad = SshConfigRequest {
            kind: "server".into(),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_check_principal_validation() {
        let ok = SshCheckPrincipalRequest {
            kind: "host".into(),
            principal: "web01".into(),
            token: String::new(),
        };
        ok.validate().unwrap();

        let bad_type = SshCheckPrincipalRequest {
            kind: "user".into(),
            principal: "web01".into(),
            token: String::new(),
        };
        assert!(bad_type.validate().is_err());

        let no_principal = SshCheckPrincipalRequest {
            kind: "host".into(),
            principal: String::new(),
            token: String::new(),
        };
        assert!(no_principal.validate().is_err());
    }

    #[test]
    fn test_bastion_request_validation() {
        assert!(SshBastionRequest::default().validate().is_err());
        let ok = SshBastionRequest {
            user: "alice".into(),
            hostname: "web01".into(),
        };
        ok.validate().unwrap();
    }
}
