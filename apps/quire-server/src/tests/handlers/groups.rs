//! Group handler tests.

use super::super::common::*;
use crate::auth::Rpc;
use crate::config::ServerConfig;
use crate::error::ServiceError;
use crate::handlers::groups;
use crate::proto;

#[tokio::test]
async fn handler_group_create_makes_owner_admin() {
    let server = create_test_server().await;
    let owner = account();

    let group = create_test_group(&server, &owner, "  book club ").await;

    assert_eq!(group.name, "book club");
    assert!(group.workspace_account_id.is_none());
    assert_eq!(group.members.len(), 1);
    assert_eq!(group.members[0].account_id, owner);
    assert!(group.members[0].is_admin);
    assert_eq!(group.conversations.len(), 1);
    assert!(group.invites.is_empty());
}

#[tokio::test]
async fn handler_group_create_rejects_blank_name() {
    let server = create_test_server().await;

    let err = groups::create_group(
        state(&server),
        caller(&account()),
        Rpc(proto::CreateGroupRequest {
            name: "   ".to_string(),
            description: None,
            avatar_url: None,
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ServiceError::InvalidArgument(_)));
}

#[tokio::test]
async fn handler_group_get_hidden_from_strangers() {
    let server = create_test_server().await;
    let owner = account();
    let group = create_test_group(&server, &owner, "private").await;

    let axum::Json(seen) = groups::get_group(
        state(&server),
        caller(&owner),
        Rpc(proto::GetGroupRequest {
            group_id: group.id.clone(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(seen.id, group.id);

    let err = groups::get_group(
        state(&server),
        caller(&account()),
        Rpc(proto::GetGroupRequest { group_id: group.id }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn handler_workspace_create_and_get() {
    let server = create_test_server().await;
    let owner = account();

    let workspace = create_test_workspace(&server, &owner).await;
    assert_eq!(workspace.workspace_account_id.as_ref(), Some(&owner));
    assert!(workspace.members.is_empty());
    assert!(workspace.conversations.is_empty());

    let axum::Json(found) = groups::get_workspace(state(&server), caller(&owner), Rpc(proto::Empty {}))
        .await
        .unwrap();
    assert_eq!(found.id, workspace.id);

    let err = groups::create_workspace(
        state(&server),
        caller(&owner),
        Rpc(proto::CreateGroupRequest {
            name: "second".to_string(),
            description: None,
            avatar_url: None,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyExists(_)));
}

#[tokio::test]
async fn handler_workspace_missing_is_not_found() {
    let server = create_test_server().await;

    let err = groups::get_workspace(state(&server), caller(&account()), Rpc(proto::Empty {}))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn handler_group_update_requires_admin() {
    let server = create_test_server().await;
    let owner = account();
    let member = account();
    let group = create_test_group(&server, &owner, "team").await;
    join_via_invite(&server, &group.id, &owner, &member).await;

    let update = |name: &str| proto::UpdateGroupRequest {
        group_id: group.id.clone(),
        name: Some(name.to_string()),
        description: Some("weekly".to_string()),
        avatar_url: None,
    };

    let err = groups::update_group(state(&server), caller(&member), Rpc(update("mine now")))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let axum::Json(updated) = groups::update_group(state(&server), caller(&owner), Rpc(update("renamed")))
        .await
        .unwrap();
    assert_eq!(updated.name, "renamed");
    assert_eq!(updated.description.as_deref(), Some("weekly"));
    assert!(updated.modified_at >= group.modified_at);
}

#[tokio::test]
async fn handler_group_update_needs_a_field() {
    let server = create_test_server().await;
    let owner = account();
    let group = create_test_group(&server, &owner, "team").await;

    let err = groups::update_group(
        state(&server),
        caller(&owner),
        Rpc(proto::UpdateGroupRequest {
            group_id: group.id,
            name: None,
            description: None,
            avatar_url: None,
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ServiceError::InvalidArgument(_)));
}

#[tokio::test]
async fn handler_group_delete_requires_admin() {
    let server = create_test_server().await;
    let owner = account();
    let member = account();
    let group = create_test_group(&server, &owner, "team").await;
    join_via_invite(&server, &group.id, &owner, &member).await;

    let err = groups::delete_group(
        state(&server),
        caller(&member),
        Rpc(proto::DeleteGroupRequest {
            group_id: group.id.clone(),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let axum::Json(resp) = groups::delete_group(
        state(&server),
        caller(&owner),
        Rpc(proto::DeleteGroupRequest {
            group_id: group.id.clone(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(resp.notes_relocated, 0);

    let err = groups::get_group(
        state(&server),
        caller(&owner),
        Rpc(proto::GetGroupRequest { group_id: group.id }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn handler_workspace_cannot_be_deleted() {
    let server = create_test_server().await;
    let owner = account();
    let workspace = create_test_workspace(&server, &owner).await;

    let err = groups::delete_group(
        state(&server),
        caller(&owner),
        Rpc(proto::DeleteGroupRequest {
            group_id: workspace.id,
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn handler_group_list_pages_through_everything() {
    let server = create_test_server_with_config(ServerConfig {
        max_page_size: 2,
        ..ServerConfig::default()
    })
    .await;
    let owner = account();
    create_test_workspace(&server, &owner).await;
    for name in ["a", "b", "c", "d"] {
        create_test_group(&server, &owner, name).await;
    }
    // Someone else's group stays out of the listing.
    create_test_group(&server, &account(), "other").await;

    let mut seen = Vec::new();
    let mut token = None;
    loop {
        let axum::Json(page) = groups::list_groups(
            state(&server),
            caller(&owner),
            Rpc(proto::ListGroupsRequest {
                // Larger than the configured maximum; clamped to 2.
                page_size: Some(50),
                page_token: token.take(),
            }),
        )
        .await
        .unwrap();
        assert!(page.groups.len() <= 2);
        seen.extend(page.groups.into_iter().map(|g| g.name));
        match page.next_page_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    assert_eq!(seen, vec!["Personal", "a", "b", "c", "d"]);
}

#[tokio::test]
async fn handler_group_list_rejects_bad_token() {
    let server = create_test_server().await;

    let err = groups::list_groups(
        state(&server),
        caller(&account()),
        Rpc(proto::ListGroupsRequest {
            page_size: None,
            page_token: Some("not-a-token".to_string()),
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ServiceError::InvalidArgument(_)));
}

#[tokio::test]
async fn handler_group_list_rejects_out_of_range_token() {
    let server = create_test_server().await;

    let err = groups::list_groups(
        state(&server),
        caller(&account()),
        Rpc(proto::ListGroupsRequest {
            page_size: None,
            page_token: Some("ffffffffffffffff".to_string()),
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ServiceError::InvalidArgument(_)));
}
