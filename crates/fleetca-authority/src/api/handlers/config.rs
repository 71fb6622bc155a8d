//! SSH configuration template handler

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use fleetca_core::options::SshCertType;

use crate::api::error::ApiError;
use crate::api::types::{SshConfigRequest, SshConfigResponse};
use crate::api::AppState;

/// `POST /ssh/config`
///
/// Renders the configured templates of the requested type against the
/// request's data map; outputs land in the field matching the type.
pub async fn ssh_config(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SshConfigRequest>, JsonRejection>,
) -> Result<Json<SshConfigResponse>, ApiError> {
    let Json(body) =
        payload.map_err(|e| ApiError::BadRequest(format!("error reading request body: {e}")))?;
    body.validate()?;

    let cert_type = body.cert_type()?;
    let outputs = state.authority.get_ssh_config(cert_type, &body.data)?;

    let mut response = SshConfigResponse::default();
    match cert_type {
        SshCertType::User => response.user_templates = Some(outputs),
        SshCertType::Host => response.host_templates = Some(outputs),
    }
    Ok(Json(response))
}
