//! Host discovery handlers: check-host, hosts, bastion

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{
    SshBastionRequest, SshBastionResponse, SshCheckPrincipalRequest, SshCheckPrincipalResponse,
    SshGetHostsResponse,
};
use crate::api::{AppState, PeerCertificate};

/// `POST /ssh/check-host`
///
/// Whether a certificate exists for the given host principal.
pub async fn ssh_check_host(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SshCheckPrincipalRequest>, JsonRejection>,
) -> Result<Json<SshCheckPrincipalResponse>, ApiError> {
    let Json(body) =
        payload.map_err(|e| ApiError::BadRequest(format!("error reading request body: {e}")))?;
    body.validate()?;

    let exists = state
        .authority
        .check_ssh_host(&body.principal, &body.token)
        .await?;
    Ok(Json(SshCheckPrincipalResponse { exists }))
}

/// `GET /ssh/hosts`
///
/// The SSH-enabled hosts visible to the caller. The TLS terminator, when
/// present, injects the first peer certificate as a request extension;
/// its absence is equivalent to an unauthenticated caller.
pub async fn ssh_get_hosts(
    State(state): State<Arc<AppState>>,
    peer: Option<Extension<PeerCertificate>>,
) -> Result<Json<SshGetHostsResponse>, ApiError> {
    let peer_der = peer.as_ref().map(|Extension(cert)| cert.0.as_slice());
    let hosts = state.authority.get_ssh_hosts(peer_der).await?;
    Ok(Json(SshGetHostsResponse { hosts }))
}

/// `POST /ssh/bastion`
///
/// The bastion fronting the given host for the given user, if any.
pub async fn ssh_bastion(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SshBastionRequest>, JsonRejection>,
) -> Result<Json<SshBastionResponse>, ApiError> {
    let Json(body) =
        payload.map_err(|e| ApiError::BadRequest(format!("error reading request body: {e}")))?;
    body.validate()?;

    let bastion = state
        .authority
        .get_ssh_bastion(&body.user, &body.hostname)
        .await?;
    Ok(Json(SshBastionResponse {
        hostname: body.hostname,
        bastion: Some(bastion),
    }))
}
