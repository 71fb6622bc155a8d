//! # Fleetca Provisioner
//!
//! One-time-token (OTT) validation for the fleetca SSH certificate
//! authority.
//!
//! A provisioner validates an OTT presented with a signing request and
//! emits the ordered sign-time policies that constrain the resulting
//! certificate. Tokens are single-use: the replay guard records each
//! token's `jti` on first presentation and rejects any further one. The
//! identity-certificate co-issuance path re-presents the same token once,
//! carrying an explicit `skip_token_reuse` flag in its
//! [`AuthorizeRequest`].

pub mod claims;
pub mod error;
pub mod provisioner;
pub mod replay;

pub use claims::OttClaims;
pub use error::{OttError, Result};
pub use provisioner::{
    Authorization, AuthorizeRequest, PolicyDefaults, Provisioner, SignMethod,
};
pub use replay::{ReplayGuard, DEFAULT_REPLAY_CAPACITY};
