//! HTTP handlers, one per API verb
//!
//! Handlers are thin adapters: parse, validate, call the orchestrator,
//! map the result or error onto the wire. All policy lives below them.

mod config;
mod hosts;
mod roots;
mod sign;

pub use config::ssh_config;
pub use hosts::{ssh_bastion, ssh_check_host, ssh_get_hosts};
pub use roots::{ssh_federation, ssh_roots};
pub use sign::{ssh_rekey, ssh_renew, ssh_sign};
