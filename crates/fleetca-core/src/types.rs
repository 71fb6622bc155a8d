//! Records exchanged with the host/bastion discovery callbacks

use serde::{Deserialize, Serialize};

/// An SSH-enabled host known to the authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Hostname clients connect to
    pub hostname: String,

    /// Backend identifier for the host, if the enumeration source has one
    #[serde(rename = "hostID", default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,

    /// Free-form grouping tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Host {
    /// Create a host record with just a hostname
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            host_id: None,
            tags: Vec::new(),
        }
    }
}

/// A jump host fronting a target SSH host.
///
/// Returned verbatim to clients; the authority attaches no meaning to the
/// fields beyond the hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bastion {
    /// Hostname of the bastion
    pub hostname: String,

    /// User to connect to the bastion as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Port the bastion listens on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,

    /// ProxyCommand to reach the target through the bastion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Extra ssh flags for the hop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
}

impl Bastion {
    /// Create a bastion record with just a hostname
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            user: None,
            port: None,
            command: None,
            flags: None,
        }
    }
}

/// An identity resolved from an external directory for a token subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Usernames the subject may request as principals
    pub usernames: Vec<String>,
}

/// The user and host CA public keys accepted by the authority
#[derive(Debug, Clone, Default)]
pub struct SshTrustedKeys {
    /// Accepted user CA public keys
    pub user_keys: Vec<ssh_key::PublicKey>,
    /// Accepted host CA public keys
    pub host_keys: Vec<ssh_key::PublicKey>,
}

impl SshTrustedKeys {
    /// Whether both lists are empty
    pub fn is_empty(&self) -> bool {
        self.user_keys.is_empty() && self.host_keys.is_empty()
    }
}
