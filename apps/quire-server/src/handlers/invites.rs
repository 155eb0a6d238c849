//! Invite handlers: send, get, accept, deny, revoke, list

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use quire_storage::{CreateInviteParams, GroupInvite, InviteFilter};
use tracing::info;

use crate::auth::{Caller, Rpc};
use crate::error::ServiceError;
use crate::proto;
use crate::server::QuireServer;

fn invite_err(e: quire_storage::StoreError) -> ServiceError {
    ServiceError::from_store(e, "invite", "invite conflict")
}

pub async fn send_invite(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::SendInviteRequest>,
) -> Result<Json<proto::Invite>, ServiceError> {
    if req.recipient_account_id == caller {
        return Err(ServiceError::InvalidArgument(
            "cannot invite yourself".into(),
        ));
    }
    let now = Utc::now();
    let valid_until = req.valid_until.unwrap_or(now + server.config.invite_ttl);
    if valid_until <= now {
        return Err(ServiceError::InvalidArgument(
            "valid_until must be in the future".into(),
        ));
    }

    let invite = server
        .store
        .create_invite(&CreateInviteParams {
            group_id: req.group_id,
            sender_account_id: caller.clone(),
            recipient_account_id: req.recipient_account_id,
            valid_until,
        })
        .await
        .map_err(invite_err)?;

    info!(
        group_id = %invite.group_id.0,
        account_id = %caller.0,
        recipient = %invite.recipient_account_id.0,
        invite_id = %invite.id.0,
        "invite sent"
    );
    Ok(Json(invite.into()))
}

pub async fn get_invite(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::InviteRef>,
) -> Result<Json<proto::Invite>, ServiceError> {
    let invite = server
        .store
        .get_invite(&req.group_id, &req.invite_id, &caller)
        .await
        .map_err(invite_err)?;
    Ok(Json(invite.into()))
}

pub async fn accept_invite(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::InviteRef>,
) -> Result<Json<proto::Member>, ServiceError> {
    let member = server
        .store
        .accept_invite(&req.group_id, &req.invite_id, &caller)
        .await
        .map_err(|e| ServiceError::from_store(e, "invite", "already a member"))?;

    info!(group_id = %req.group_id.0, account_id = %caller.0, "invite accepted");
    Ok(Json(member.into()))
}

pub async fn deny_invite(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::InviteRef>,
) -> Result<Json<proto::Empty>, ServiceError> {
    server
        .store
        .deny_invite(&req.group_id, &req.invite_id, &caller)
        .await
        .map_err(invite_err)?;

    info!(group_id = %req.group_id.0, account_id = %caller.0, "invite denied");
    Ok(Json(proto::Empty {}))
}

pub async fn revoke_invite(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::InviteRef>,
) -> Result<Json<proto::Empty>, ServiceError> {
    server
        .store
        .revoke_invite(&req.group_id, &req.invite_id, &caller)
        .await
        .map_err(invite_err)?;

    info!(
        group_id = %req.group_id.0,
        account_id = %caller.0,
        invite_id = %req.invite_id.0,
        "invite revoked"
    );
    Ok(Json(proto::Empty {}))
}

/// List invites.
///
/// Sender and recipient filters may only name the caller. With neither of
/// them and no group, the caller's sent and received invites are returned. A
/// group filter alone returns what the caller can see in that group.
pub async fn list_invites(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::ListInvitesRequest>,
) -> Result<Json<proto::InviteList>, ServiceError> {
    for named in [&req.sender_account_id, &req.recipient_account_id]
        .into_iter()
        .flatten()
    {
        if *named != caller {
            return Err(ServiceError::PermissionDenied(
                "cannot list invites of another account".into(),
            ));
        }
    }

    let filter = |sender, recipient| InviteFilter {
        viewer: caller.clone(),
        sender_account_id: sender,
        recipient_account_id: recipient,
        group_id: req.group_id.clone(),
    };

    let invites: Vec<GroupInvite> = if req.sender_account_id.is_none()
        && req.recipient_account_id.is_none()
        && req.group_id.is_none()
    {
        let mut sent = server
            .store
            .list_invites(&filter(Some(caller.clone()), None))
            .await
            .map_err(invite_err)?;
        let received = server
            .store
            .list_invites(&filter(None, Some(caller.clone())))
            .await
            .map_err(invite_err)?;
        sent.extend(received);
        sent.sort_by(|a, b| (a.created_at, a.id.0).cmp(&(b.created_at, b.id.0)));
        sent
    } else {
        server
            .store
            .list_invites(&filter(
                req.sender_account_id.clone(),
                req.recipient_account_id.clone(),
            ))
            .await
            .map_err(invite_err)?
    };

    Ok(Json(proto::InviteList {
        invites: invites.into_iter().map(proto::Invite::from).collect(),
    }))
}
