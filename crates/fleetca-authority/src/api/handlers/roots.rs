//! Trust-bundle handlers: roots and federation

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use fleetca_core::SshTrustedKeys;

use crate::api::codec::SshPublicKey;
use crate::api::error::ApiError;
use crate::api::types::SshRootsResponse;
use crate::api::AppState;

fn to_response(keys: SshTrustedKeys) -> Result<Json<SshRootsResponse>, ApiError> {
    if keys.is_empty() {
        return Err(ApiError::NotFound("no keys found".into()));
    }
    Ok(Json(SshRootsResponse {
        user_keys: keys.user_keys.into_iter().map(SshPublicKey::from).collect(),
        host_keys: keys.host_keys.into_iter().map(SshPublicKey::from).collect(),
    }))
}

/// `GET /ssh/roots`
///
/// The user and host CA public keys this authority issues under.
pub async fn ssh_roots(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SshRootsResponse>, ApiError> {
    to_response(state.authority.get_ssh_roots())
}

/// `GET /ssh/federation`
///
/// The user and host CA public keys accepted across the federation.
pub async fn ssh_federation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SshRootsResponse>, ApiError> {
    to_response(state.authority.get_ssh_federation())
}
