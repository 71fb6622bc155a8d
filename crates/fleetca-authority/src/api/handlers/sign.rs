//! Signing handlers: sign, renew, rekey

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use fleetca_core::chain_to_pem;
use ssh_key::PublicKey;

use crate::api::error::ApiError;
use crate::api::types::{SshRekeyRequest, SshRenewRequest, SshSignRequest, SshSignResponse};
use crate::api::AppState;

type Body<T> = Result<Json<T>, JsonRejection>;

fn read_body<T>(payload: Body<T>) -> Result<T, ApiError> {
    let Json(body) = payload
        .map_err(|e| ApiError::BadRequest(format!("error reading request body: {e}")))?;
    Ok(body)
}

/// `POST /ssh/sign`
///
/// Reads an [`SshSignRequest`] carrying a one-time token and returns the
/// newly signed certificate plus any companion artifacts.
pub async fn ssh_sign(
    State(state): State<Arc<AppState>>,
    payload: Body<SshSignRequest>,
) -> Result<(StatusCode, Json<SshSignResponse>), ApiError> {
    let body = read_body(payload)?;
    body.validate()?;

    let public_key = PublicKey::from_bytes(&body.public_key)
        .map_err(|e| ApiError::BadRequest(format!("error parsing publicKey: {e}")))?;
    let add_user_key = body
        .add_user_public_key
        .as_deref()
        .map(PublicKey::from_bytes)
        .transpose()
        .map_err(|e| ApiError::BadRequest(format!("error parsing addUserPublicKey: {e}")))?;
    let identity_csr = body.identity_csr_der()?;
    let opts = body.options()?;

    let artifacts = state
        .authority
        .sign_ssh(
            &public_key,
            &opts,
            &body.ott,
            add_user_key.as_ref(),
            identity_csr.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SshSignResponse {
            certificate: artifacts.certificate.into(),
            add_user_certificate: artifacts.add_user_certificate.map(Into::into),
            identity_certificate: artifacts.identity_chain.map(|chain| chain_to_pem(&chain)),
        }),
    ))
}

/// `POST /ssh/renew`
///
/// Re-signs the presented certificate over its own key with a fresh
/// window. Authentication is transport-level; no token is read.
pub async fn ssh_renew(
    State(state): State<Arc<AppState>>,
    payload: Body<SshRenewRequest>,
) -> Result<(StatusCode, Json<SshSignResponse>), ApiError> {
    let body = read_body(payload)?;
    body.validate()?;
    let cert = body
        .certificate
        .0
        .ok_or_else(|| ApiError::BadRequest("missing or empty crt".into()))?;

    let renewed = state.authority.renew_ssh(&cert)?;
    Ok((
        StatusCode::CREATED,
        Json(SshSignResponse {
            certificate: renewed.into(),
            add_user_certificate: None,
            identity_certificate: None,
        }),
    ))
}

/// `POST /ssh/rekey`
///
/// Re-signs the presented certificate's identity over a new public key.
/// Authentication is transport-level; no token is read.
pub async fn ssh_rekey(
    State(state): State<Arc<AppState>>,
    payload: Body<SshRekeyRequest>,
) -> Result<(StatusCode, Json<SshSignResponse>), ApiError> {
    let body = read_body(payload)?;
    body.validate()?;
    let cert = body
        .certificate
        .0
        .ok_or_else(|| ApiError::BadRequest("missing or empty crt".into()))?;
    let public_key = PublicKey::from_bytes(&body.public_key)
        .map_err(|e| ApiError::BadRequest(format!("error parsing publicKey: {e}")))?;

    let rekeyed = state.authority.rekey_ssh(&cert, &public_key)?;
    Ok((
        StatusCode::CREATED,
        Json(SshSignResponse {
            certificate: rekeyed.into(),
            add_user_certificate: None,
            identity_certificate: None,
        }),
    ))
}
