//! One-time-token replay protection
//!
//! A one-time token authorizes exactly one signing operation, and the
//! guard is what makes "exactly one" true under concurrency: consuming a
//! token ID is a single atomic get-or-insert on the underlying cache, so
//! of any number of simultaneous presentations of the same `jti`,
//! precisely one observes a fresh entry and wins. A separate
//! check-then-insert would let two concurrent requests both pass.
//!
//! Entries carry the token's own remaining lifetime as their TTL: once a
//! token has expired, tracking its ID buys nothing, so memory is bounded
//! without a sweeper. A capacity-bounded LRU backs that up.
//!
//! This is the only serialization point on the signing path. The
//! orchestrator bypasses it exactly once per request, for the identity
//! co-issuance re-authorization, by not consulting the guard at all
//! (`AuthorizeRequest::skip_token_reuse`).

use std::time::{Duration, Instant};

use moka::{future::Cache, policy::EvictionPolicy};

use crate::error::OttError;

/// Default number of token IDs tracked simultaneously
pub const DEFAULT_REPLAY_CAPACITY: u64 = 100_000;

/// Entries expire when the token they track does; the cached value is
/// the absolute expiration instant.
struct TokenLifetime;

impl moka::Expiry<String, Instant> for TokenLifetime {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Instant,
        created_at: Instant,
    ) -> Option<Duration> {
        Some(value.saturating_duration_since(created_at))
    }
}

/// Consumes one-time-token IDs and rejects any second presentation.
///
/// Safe for concurrent use from multiple tasks. Note that when capacity
/// is exceeded the least-recently-used entry is evicted, which re-opens
/// a replay window for that token; size the capacity well above the
/// number of tokens live at once.
pub struct ReplayGuard {
    used: Cache<String, Instant>,
}

impl ReplayGuard {
    /// Create a guard tracking at most `max_capacity` token IDs
    pub fn new(max_capacity: u64) -> Self {
        let used = Cache::builder()
            .max_capacity(max_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(TokenLifetime)
            .build();
        Self { used }
    }

    /// Consume a token ID.
    ///
    /// `expires_in` is the token's remaining lifetime and bounds how long
    /// the ID stays tracked. The insert is atomic per key: exactly one of
    /// any set of concurrent calls for the same ID succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`OttError::TokenReplayed`] if the ID was already
    /// consumed.
    pub async fn mark_used(&self, jti: &str, expires_in: Duration) -> Result<(), OttError> {
        let expiration = Instant::now() + expires_in;
        let entry = self.used.entry(jti.to_owned()).or_insert(expiration).await;
        if !entry.is_fresh() {
            return Err(OttError::TokenReplayed(jti.to_owned()));
        }
        Ok(())
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_CAPACITY)
    }
}
