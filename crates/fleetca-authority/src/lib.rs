//! # Fleetca Authority
//!
//! The SSH certificate authority service: issues, renews, and rekeys
//! OpenSSH user and host certificates on behalf of token-authenticated
//! callers, co-issues identity X.509 certificates sharing the SSH
//! certificate's lifetime, and exposes the trust-bundle and
//! host-discovery operations an SSH fleet bootstraps against.
//!
//! ## API Endpoints
//!
//! ### Signing
//! - `POST /ssh/sign` - Sign an SSH certificate from a one-time token
//! - `POST /ssh/renew` - Re-sign a certificate over its own key
//! - `POST /ssh/rekey` - Re-sign a certificate over a new key
//!
//! ### Trust bundles
//! - `GET /ssh/roots` - This authority's user and host CA keys
//! - `GET /ssh/federation` - CA keys accepted across the federation
//!
//! ### Fleet bootstrap
//! - `POST /ssh/config` - Rendered ssh config templates
//! - `POST /ssh/check-host` - Whether a principal is an SSH-enabled host
//! - `GET /ssh/hosts` - Hosts visible to the caller
//! - `POST /ssh/bastion` - The bastion fronting a host
//!
//! ### Health
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check with CA key counts

pub mod api;
pub mod authority;
pub mod callbacks;
pub mod error;
pub mod kms;
pub mod storage;
pub mod templates;

pub use api::{create_router, AppState, PeerCertificate};
pub use authority::{Authority, AuthorityBuilder, SshSignArtifacts};
pub use callbacks::{
    BastionLookup, Callbacks, HostCheck, HostEnumeration, IdentityLookup, TokenReuseSkip,
};
pub use error::CaError;
pub use kms::{KeyManager, SoftKeyManager};
pub use storage::{AuthDb, DbError, MemoryDb};
pub use templates::{Output, SshTemplate, SshTemplates, TemplateKind};
