//! Invite link handlers: generate, get, list, revoke, use
//!
//! Links are reusable join credentials. Only the admin who generated a link
//! can read or revoke it; anyone holding the code can redeem it.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use quire_storage::{CreateInviteLinkParams, InviteCode, StoreError};
use rand_core::{OsRng, RngCore};
use tracing::info;

use crate::auth::{Caller, Rpc};
use crate::error::ServiceError;
use crate::proto;
use crate::server::QuireServer;

const CODE_BYTES: usize = 32;

/// 32 random bytes from the OS CSPRNG, hex-encoded.
pub(crate) fn generate_code() -> InviteCode {
    let mut bytes = [0u8; CODE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    InviteCode(hex::encode(bytes))
}

fn link_err(e: StoreError) -> ServiceError {
    ServiceError::from_store(e, "invite link", "invite link conflict")
}

pub async fn generate_invite_link(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::GenerateInviteLinkRequest>,
) -> Result<Json<proto::InviteLink>, ServiceError> {
    let now = Utc::now();
    let valid_until = req.valid_until.unwrap_or(now + server.config.invite_link_ttl);
    if valid_until <= now {
        return Err(ServiceError::InvalidArgument(
            "valid_until must be in the future".into(),
        ));
    }

    let link = server
        .store
        .create_invite_link(&CreateInviteLinkParams {
            group_id: req.group_id,
            code: generate_code(),
            generated_by_account_id: caller.clone(),
            valid_until,
        })
        .await
        .map_err(link_err)?;

    info!(group_id = %link.group_id.0, account_id = %caller.0, "invite link generated");
    Ok(Json(link.into()))
}

pub async fn get_invite_link(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::InviteLinkRef>,
) -> Result<Json<proto::InviteLink>, ServiceError> {
    let link = server
        .store
        .get_invite_link(&req.group_id, &req.code, &caller)
        .await
        .map_err(link_err)?;
    Ok(Json(link.into()))
}

pub async fn list_invite_links(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::ListInviteLinksRequest>,
) -> Result<Json<proto::InviteLinkList>, ServiceError> {
    let links = server
        .store
        .list_invite_links(&req.group_id, &caller)
        .await
        .map_err(link_err)?;
    Ok(Json(proto::InviteLinkList {
        links: links.into_iter().map(proto::InviteLink::from).collect(),
    }))
}

pub async fn revoke_invite_link(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::InviteLinkRef>,
) -> Result<Json<proto::Empty>, ServiceError> {
    server
        .store
        .revoke_invite_link(&req.group_id, &req.code, &caller)
        .await
        .map_err(link_err)?;

    info!(group_id = %req.group_id.0, account_id = %caller.0, "invite link revoked");
    Ok(Json(proto::Empty {}))
}

pub async fn use_invite_link(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::InviteLinkRef>,
) -> Result<Json<proto::Member>, ServiceError> {
    let member = server
        .store
        .use_invite_link(&req.group_id, &req.code, &caller)
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists => {
                ServiceError::AlreadyExists("already a member of this group".into())
            }
            other => link_err(other),
        })?;

    info!(group_id = %req.group_id.0, account_id = %caller.0, "joined via invite link");
    Ok(Json(member.into()))
}
