//! Storage abstraction for the authority database
//!
//! The durable database is an external collaborator; the authority only
//! holds a handle to it, set once at build time and reused across
//! graceful reloads. The trait is deliberately narrow: the record of
//! which principals are SSH-enabled hosts, which is what the default
//! host-check and host-enumeration callbacks in the binary close over.

pub mod memory;

pub use memory::MemoryDb;

use async_trait::async_trait;
use std::fmt::Debug;

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend failed
    #[error("database error: {0}")]
    Backend(String),
}

/// Authority database handle
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait AuthDb: Send + Sync + Debug {
    /// Record a principal as an SSH-enabled host
    async fn add_ssh_host(&self, principal: &str) -> Result<(), DbError>;

    /// Whether a principal is a known SSH-enabled host
    async fn is_ssh_host(&self, principal: &str) -> Result<bool, DbError>;

    /// All known SSH-enabled host principals
    async fn list_ssh_hosts(&self) -> Result<Vec<String>, DbError>;
}
