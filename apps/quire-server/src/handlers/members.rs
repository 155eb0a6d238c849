//! Membership handlers: promote/demote and remove (including leaving)

use axum::extract::State;
use axum::Json;
use quire_storage::UpdateMemberParams;
use tracing::info;

use crate::auth::{Caller, Rpc};
use crate::error::ServiceError;
use crate::proto;
use crate::server::QuireServer;

pub async fn update_member(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::UpdateMemberRequest>,
) -> Result<Json<proto::Member>, ServiceError> {
    let member = server
        .store
        .update_member(
            &req.group_id,
            &caller,
            &req.account_id,
            &UpdateMemberParams {
                is_admin: req.is_admin,
            },
        )
        .await
        .map_err(|e| {
            ServiceError::from_store(
                e,
                "member",
                "member already has that role, or is the last admin",
            )
        })?;

    info!(
        group_id = %req.group_id.0,
        account_id = %caller.0,
        target = %req.account_id.0,
        is_admin = member.is_admin,
        "member role changed"
    );
    Ok(Json(member.into()))
}

pub async fn remove_member(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::RemoveMemberRequest>,
) -> Result<Json<proto::Empty>, ServiceError> {
    server
        .store
        .remove_member(&req.group_id, &caller, &req.account_id)
        .await
        .map_err(|e| ServiceError::from_store(e, "member", "cannot remove the last admin"))?;

    if caller == req.account_id {
        info!(group_id = %req.group_id.0, account_id = %caller.0, "member left group");
    } else {
        info!(
            group_id = %req.group_id.0,
            account_id = %caller.0,
            target = %req.account_id.0,
            "member removed"
        );
    }
    Ok(Json(proto::Empty {}))
}
