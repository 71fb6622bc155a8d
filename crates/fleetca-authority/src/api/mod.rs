//! API module for the authority server

pub mod codec;
pub mod error;
pub mod handlers;
pub mod types;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authority::Authority;

/// The first TLS peer certificate (DER), injected as a request extension
/// by the TLS terminator
#[derive(Debug, Clone)]
pub struct PeerCertificate(pub Vec<u8>);

/// Application state shared across handlers
pub struct AppState {
    /// The certificate authority
    pub authority: Authority,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves
    pub status: String,
    /// Server version
    pub version: String,
}

/// Readiness check response
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadyResponse {
    /// Whether the authority can serve signing requests
    pub ready: bool,
    /// Number of accepted user CA keys
    pub user_ca_keys: usize,
    /// Number of accepted host CA keys
    pub host_ca_keys: usize,
    /// Number of registered SSH hosts in the database
    pub ssh_hosts: usize,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Readiness check endpoint
///
/// GET /ready
pub async fn ready(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    let roots = state.authority.get_ssh_roots();
    let ssh_hosts = state
        .authority
        .database()
        .list_ssh_hosts()
        .await
        .map(|hosts| hosts.len())
        .unwrap_or(0);

    Json(ReadyResponse {
        ready: !roots.is_empty(),
        user_ca_keys: roots.user_keys.len(),
        host_ca_keys: roots.host_keys.len(),
        ssh_hosts,
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration for browser-based tooling
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Signing endpoints
        .route("/ssh/sign", post(handlers::ssh_sign))
        .route("/ssh/renew", post(handlers::ssh_renew))
        .route("/ssh/rekey", post(handlers::ssh_rekey))
        // Trust bundle endpoints
        .route("/ssh/roots", get(handlers::ssh_roots))
        .route("/ssh/federation", get(handlers::ssh_federation))
        // Fleet bootstrap endpoints
        .route("/ssh/config", post(handlers::ssh_config))
        .route("/ssh/check-host", post(handlers::ssh_check_host))
        .route("/ssh/hosts", get(handlers::ssh_get_hosts))
        .route("/ssh/bastion", post(handlers::ssh_bastion))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
