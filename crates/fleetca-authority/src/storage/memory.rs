//! In-memory database backend
//!
//! Default implementation suitable for development and single-instance
//! deployments. Data is lost on restart.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::RwLock;
use tracing::info;

use super::{AuthDb, DbError};

/// In-memory authority database
#[derive(Debug, Default)]
pub struct MemoryDb {
    hosts: RwLock<BTreeSet<String>>,
}

impl MemoryDb {
    /// Create an empty in-memory database
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthDb for MemoryDb {
    async fn add_ssh_host(&self, principal: &str) -> Result<(), DbError> {
        let mut hosts = self
            .hosts
            .write()
            .map_err(|e| DbError::Backend(e.to_string()))?;
        if hosts.insert(principal.to_owned()) {
            info!(principal = %principal, "registered ssh host");
        }
        Ok(())
    }

    async fn is_ssh_host(&self, principal: &str) -> Result<bool, DbError> {
        let hosts = self
            .hosts
            .read()
            .map_err(|e| DbError::Backend(e.to_string()))?;
        Ok(hosts.contains(principal))
    }

    async fn list_ssh_hosts(&self) -> Result<Vec<String>, DbError> {
        let hosts = self
            .hosts
            .read()
            .map_err(|e| DbError::Backend(e.to_string()))?;
        Ok(hosts.iter().cloned().collect())
    }
}
