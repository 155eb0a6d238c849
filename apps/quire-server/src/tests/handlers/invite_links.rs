//! Invite link handler tests.

use super::super::common::*;
use crate::auth::Rpc;
use crate::error::ServiceError;
use crate::handlers::invite_links;
use crate::proto;
use chrono::{Duration, Utc};
use quire_storage::{AccountId, GroupId, InviteCode};

fn link_ref(group_id: &GroupId, code: &InviteCode) -> proto::InviteLinkRef {
    proto::InviteLinkRef {
        group_id: group_id.clone(),
        code: code.clone(),
    }
}

async fn use_link(
    server: &crate::server::QuireServer,
    who: &AccountId,
    group_id: &GroupId,
    code: &InviteCode,
) -> Result<proto::Member, ServiceError> {
    invite_links::use_invite_link(state(server), caller(who), Rpc(link_ref(group_id, code)))
        .await
        .map(|axum::Json(m)| m)
}

#[tokio::test]
async fn handler_link_generate_and_use() {
    let server = create_test_server().await;
    let owner = account();
    let group = create_test_group(&server, &owner, "team").await;

    let link = generate_test_link(&server, &group.id, &owner).await;
    assert_eq!(link.generated_by_account_id, owner);
    assert_eq!(link.code.0.len(), 64);
    assert!(link.valid_until > Utc::now() + Duration::hours(719));

    // Reusable by several people.
    let first = account();
    let second = account();
    let m = use_link(&server, &first, &group.id, &link.code).await.unwrap();
    assert!(!m.is_admin);
    use_link(&server, &second, &group.id, &link.code).await.unwrap();

    let g = load_group(&server, &group.id, &owner).await;
    assert!(g.is_member(&first) && g.is_member(&second));

    // Using it again as a member.
    let err = use_link(&server, &first, &group.id, &link.code).await.unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyExists(_)));
}

#[tokio::test]
async fn handler_link_one_per_admin() {
    let server = create_test_server().await;
    let owner = account();
    let group = create_test_group(&server, &owner, "team").await;
    generate_test_link(&server, &group.id, &owner).await;

    let err = invite_links::generate_invite_link(
        state(&server),
        caller(&owner),
        Rpc(proto::GenerateInviteLinkRequest {
            group_id: group.id,
            valid_until: None,
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ServiceError::AlreadyExists(_)));
}

#[tokio::test]
async fn handler_link_requires_admin_of_regular_group() {
    let server = create_test_server().await;
    let owner = account();
    let member = account();
    let group = create_test_group(&server, &owner, "team").await;
    join_via_invite(&server, &group.id, &owner, &member).await;
    let workspace = create_test_workspace(&server, &owner).await;

    for (who, group_id) in [(&member, &group.id), (&owner, &workspace.id)] {
        let err = invite_links::generate_invite_link(
            state(&server),
            caller(who),
            Rpc(proto::GenerateInviteLinkRequest {
                group_id: group_id.clone(),
                valid_until: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}

#[tokio::test]
async fn handler_link_past_expiry_rejected() {
    let server = create_test_server().await;
    let owner = account();
    let group = create_test_group(&server, &owner, "team").await;

    let err = invite_links::generate_invite_link(
        state(&server),
        caller(&owner),
        Rpc(proto::GenerateInviteLinkRequest {
            group_id: group.id,
            valid_until: Some(Utc::now()),
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ServiceError::InvalidArgument(_)));
}

#[tokio::test]
async fn handler_link_visible_to_creator_only() {
    let server = create_test_server().await;
    let owner = account();
    let co_admin = account();
    let group = create_test_group(&server, &owner, "team").await;
    join_via_invite(&server, &group.id, &owner, &co_admin).await;
    let link = generate_test_link(&server, &group.id, &owner).await;

    let axum::Json(got) = invite_links::get_invite_link(
        state(&server),
        caller(&owner),
        Rpc(link_ref(&group.id, &link.code)),
    )
    .await
    .unwrap();
    assert_eq!(got.code, link.code);

    let err = invite_links::get_invite_link(
        state(&server),
        caller(&co_admin),
        Rpc(link_ref(&group.id, &link.code)),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let axum::Json(theirs) = invite_links::list_invite_links(
        state(&server),
        caller(&co_admin),
        Rpc(proto::ListInviteLinksRequest {
            group_id: group.id.clone(),
        }),
    )
    .await
    .unwrap();
    assert!(theirs.links.is_empty());

    let axum::Json(mine) = invite_links::list_invite_links(
        state(&server),
        caller(&owner),
        Rpc(proto::ListInviteLinksRequest {
            group_id: group.id.clone(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(mine.links.len(), 1);
}

#[tokio::test]
async fn handler_link_revoke() {
    let server = create_test_server().await;
    let owner = account();
    let group = create_test_group(&server, &owner, "team").await;
    let link = generate_test_link(&server, &group.id, &owner).await;

    // Only the creator may revoke.
    let err = invite_links::revoke_invite_link(
        state(&server),
        caller(&account()),
        Rpc(link_ref(&group.id, &link.code)),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    invite_links::revoke_invite_link(
        state(&server),
        caller(&owner),
        Rpc(link_ref(&group.id, &link.code)),
    )
    .await
    .unwrap();

    let err = use_link(&server, &account(), &group.id, &link.code).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // A new link may be generated afterwards.
    let fresh = generate_test_link(&server, &group.id, &owner).await;
    assert_ne!(fresh.code, link.code);
}

#[tokio::test]
async fn handler_link_use_clears_pending_invites() {
    let server = create_test_server().await;
    let owner = account();
    let guest = account();
    let group = create_test_group(&server, &owner, "team").await;
    send_test_invite(&server, &group.id, &owner, &guest).await;
    let link = generate_test_link(&server, &group.id, &owner).await;

    use_link(&server, &guest, &group.id, &link.code).await.unwrap();

    let g = load_group(&server, &group.id, &owner).await;
    assert!(g.is_member(&guest));
    assert!(g.invites.is_empty());
}

#[tokio::test]
async fn handler_link_wrong_group_is_not_found() {
    let server = create_test_server().await;
    let owner = account();
    let team = create_test_group(&server, &owner, "team").await;
    let other = create_test_group(&server, &owner, "other").await;
    let link = generate_test_link(&server, &team.id, &owner).await;

    let err = use_link(&server, &account(), &other.id, &link.code).await.unwrap_err();

    assert!(matches!(err, ServiceError::NotFound(_)));
}
