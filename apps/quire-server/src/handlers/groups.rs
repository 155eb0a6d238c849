//! Group handlers: create, get, list, update, delete, plus personal workspaces

use axum::extract::State;
use axum::Json;
use quire_storage::{
    CreateGroupParams, CreateWorkspaceParams, ListGroupsParams, UpdateGroupParams,
};
use tracing::info;

use crate::auth::{Caller, Rpc};
use crate::error::ServiceError;
use crate::proto;
use crate::server::QuireServer;

const MAX_NAME_LEN: usize = 128;

fn validate_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidArgument("name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ServiceError::InvalidArgument(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Page tokens are the hex-encoded big-endian offset of the next page.
pub(crate) fn encode_page_token(offset: u64) -> String {
    hex::encode(offset.to_be_bytes())
}

pub(crate) fn decode_page_token(token: &str) -> Result<u64, ServiceError> {
    let invalid = || ServiceError::InvalidArgument("invalid page_token".into());
    let bytes: [u8; 8] = hex::decode(token)
        .map_err(|_| invalid())?
        .try_into()
        .map_err(|_| invalid())?;
    let offset = u64::from_be_bytes(bytes);
    // Offsets are bound as SQL integers.
    if offset > i64::MAX as u64 {
        return Err(invalid());
    }
    Ok(offset)
}

pub async fn create_group(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::CreateGroupRequest>,
) -> Result<Json<proto::Group>, ServiceError> {
    let name = validate_name(&req.name)?;

    let group = server
        .store
        .create_group(&CreateGroupParams {
            name,
            description: req.description,
            avatar_url: req.avatar_url,
            owner_account_id: caller.clone(),
        })
        .await
        .map_err(|e| ServiceError::from_store(e, "group", "group conflict"))?;

    info!(group_id = %group.id.0, account_id = %caller.0, "group created");
    Ok(Json(group.into()))
}

pub async fn create_workspace(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::CreateGroupRequest>,
) -> Result<Json<proto::Group>, ServiceError> {
    let name = validate_name(&req.name)?;

    let workspace = server
        .store
        .create_workspace(&CreateWorkspaceParams {
            name,
            description: req.description,
            avatar_url: req.avatar_url,
            owner_account_id: caller.clone(),
        })
        .await
        .map_err(|e| ServiceError::from_store(e, "workspace", "workspace conflict"))?;

    info!(group_id = %workspace.id.0, account_id = %caller.0, "workspace created");
    Ok(Json(workspace.into()))
}

pub async fn get_group(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::GetGroupRequest>,
) -> Result<Json<proto::Group>, ServiceError> {
    let group = server
        .store
        .get_group(&req.group_id, &caller)
        .await
        .map_err(|e| ServiceError::from_store(e, "group", "group conflict"))?;
    Ok(Json(group.into()))
}

pub async fn get_workspace(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(_): Rpc<proto::Empty>,
) -> Result<Json<proto::Group>, ServiceError> {
    let workspace = server
        .store
        .get_workspace(&caller)
        .await
        .map_err(|e| ServiceError::from_store(e, "workspace", "workspace conflict"))?;
    Ok(Json(workspace.into()))
}

pub async fn update_group(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::UpdateGroupRequest>,
) -> Result<Json<proto::Group>, ServiceError> {
    let params = UpdateGroupParams {
        name: req.name.as_deref().map(validate_name).transpose()?,
        description: req.description,
        avatar_url: req.avatar_url,
    };
    if params.is_empty() {
        return Err(ServiceError::InvalidArgument("nothing to update".into()));
    }

    let group = server
        .store
        .update_group(&req.group_id, &caller, &params)
        .await
        .map_err(|e| ServiceError::from_store(e, "group", "group conflict"))?;

    info!(group_id = %group.id.0, account_id = %caller.0, "group updated");
    Ok(Json(group.into()))
}

pub async fn delete_group(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::DeleteGroupRequest>,
) -> Result<Json<proto::DeleteGroupResponse>, ServiceError> {
    let notes_relocated = server
        .store
        .delete_group(&req.group_id, &caller)
        .await
        .map_err(|e| ServiceError::from_store(e, "group", "group conflict"))?;

    info!(
        group_id = %req.group_id.0,
        account_id = %caller.0,
        notes_relocated,
        "group deleted"
    );
    Ok(Json(proto::DeleteGroupResponse { notes_relocated }))
}

pub async fn list_groups(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::ListGroupsRequest>,
) -> Result<Json<proto::ListGroupsResponse>, ServiceError> {
    let max = server.config.max_page_size;
    let limit = req.page_size.filter(|n| *n > 0).unwrap_or(max).min(max);
    let offset = match req.page_token.as_deref() {
        None | Some("") => 0,
        Some(token) => decode_page_token(token)?,
    };

    let page = server
        .store
        .list_groups(&ListGroupsParams {
            account_id: caller,
            limit,
            offset,
        })
        .await
        .map_err(|e| ServiceError::from_store(e, "group", "group conflict"))?;

    Ok(Json(proto::ListGroupsResponse {
        groups: page.groups.into_iter().map(proto::Group::from).collect(),
        next_page_token: page.next_offset.map(encode_page_token),
    }))
}
