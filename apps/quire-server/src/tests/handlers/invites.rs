//! Invite handler tests.

use super::super::common::*;
use crate::auth::Rpc;
use crate::error::ServiceError;
use crate::handlers::invites;
use crate::proto;
use chrono::{Duration, Utc};

#[tokio::test]
async fn handler_invite_send_and_accept() {
    let server = create_test_server().await;
    let owner = account();
    let guest = account();
    let group = create_test_group(&server, &owner, "team").await;

    let invite = send_test_invite(&server, &group.id, &owner, &guest).await;
    assert_eq!(invite.sender_account_id, owner);
    assert_eq!(invite.recipient_account_id, guest);
    assert!(invite.valid_until > Utc::now() + Duration::hours(167));

    // The recipient can look at it before answering.
    let axum::Json(seen) = invites::get_invite(
        state(&server),
        caller(&guest),
        Rpc(proto::InviteRef {
            group_id: group.id.clone(),
            invite_id: invite.id.clone(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(seen.id, invite.id);

    let axum::Json(member) = invites::accept_invite(
        state(&server),
        caller(&guest),
        Rpc(proto::InviteRef {
            group_id: group.id.clone(),
            invite_id: invite.id.clone(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(member.account_id, guest);
    assert!(!member.is_admin);

    let g = load_group(&server, &group.id, &guest).await;
    assert!(g.is_member(&guest));
    assert!(g.invites.is_empty());

    // Accepting twice finds nothing.
    let err = invites::accept_invite(
        state(&server),
        caller(&guest),
        Rpc(proto::InviteRef {
            group_id: group.id,
            invite_id: invite.id,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn handler_invite_send_validation() {
    let server = create_test_server().await;
    let owner = account();
    let group = create_test_group(&server, &owner, "team").await;

    let err = invites::send_invite(
        state(&server),
        caller(&owner),
        Rpc(proto::SendInviteRequest {
            group_id: group.id.clone(),
            recipient_account_id: owner.clone(),
            valid_until: None,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidArgument(_)));

    let err = invites::send_invite(
        state(&server),
        caller(&owner),
        Rpc(proto::SendInviteRequest {
            group_id: group.id,
            recipient_account_id: account(),
            valid_until: Some(Utc::now() - Duration::minutes(1)),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidArgument(_)));
}

#[tokio::test]
async fn handler_invite_send_preconditions() {
    let server = create_test_server().await;
    let owner = account();
    let member = account();
    let guest = account();
    let group = create_test_group(&server, &owner, "team").await;
    join_via_invite(&server, &group.id, &owner, &member).await;

    let send = |sender: &quire_storage::AccountId, recipient: &quire_storage::AccountId| {
        invites::send_invite(
            state(&server),
            caller(sender),
            Rpc(proto::SendInviteRequest {
                group_id: group.id.clone(),
                recipient_account_id: recipient.clone(),
                valid_until: None,
            }),
        )
    };

    // Inviting an existing member.
    let err = send(&owner, &member).await.unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyExists(_)));

    // Non-members cannot invite.
    let err = send(&account(), &guest).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // Any member may invite, once per recipient.
    send(&member, &guest).await.unwrap();
    let err = send(&member, &guest).await.unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyExists(_)));

    // A different sender may invite the same recipient.
    send(&owner, &guest).await.unwrap();
}

#[tokio::test]
async fn handler_invite_not_into_workspace() {
    let server = create_test_server().await;
    let owner = account();
    let workspace = create_test_workspace(&server, &owner).await;

    let err = invites::send_invite(
        state(&server),
        caller(&owner),
        Rpc(proto::SendInviteRequest {
            group_id: workspace.id,
            recipient_account_id: account(),
            valid_until: None,
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn handler_invite_deny_and_revoke() {
    let server = create_test_server().await;
    let owner = account();
    let member = account();
    let guest = account();
    let group = create_test_group(&server, &owner, "team").await;
    join_via_invite(&server, &group.id, &owner, &member).await;

    let first = send_test_invite(&server, &group.id, &member, &guest).await;
    let r = |invite: &proto::Invite| proto::InviteRef {
        group_id: group.id.clone(),
        invite_id: invite.id.clone(),
    };

    // Only the recipient may deny.
    let err = invites::deny_invite(state(&server), caller(&owner), Rpc(r(&first)))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    invites::deny_invite(state(&server), caller(&guest), Rpc(r(&first)))
        .await
        .unwrap();

    // An admin may revoke a member's invite.
    let second = send_test_invite(&server, &group.id, &member, &guest).await;
    invites::revoke_invite(state(&server), caller(&owner), Rpc(r(&second)))
        .await
        .unwrap();

    // The recipient may not revoke.
    let third = send_test_invite(&server, &group.id, &member, &guest).await;
    let err = invites::revoke_invite(state(&server), caller(&guest), Rpc(r(&third)))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    invites::revoke_invite(state(&server), caller(&member), Rpc(r(&third)))
        .await
        .unwrap();

    let g = load_group(&server, &group.id, &owner).await;
    assert!(g.invites.is_empty());
}

#[tokio::test]
async fn handler_invite_hidden_from_strangers() {
    let server = create_test_server().await;
    let owner = account();
    let guest = account();
    let group = create_test_group(&server, &owner, "team").await;
    let invite = send_test_invite(&server, &group.id, &owner, &guest).await;

    let err = invites::get_invite(
        state(&server),
        caller(&account()),
        Rpc(proto::InviteRef {
            group_id: group.id,
            invite_id: invite.id,
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn handler_invite_list_filters() {
    let server = create_test_server().await;
    let alice = account();
    let bob = account();
    let carol = account();
    let team = create_test_group(&server, &alice, "team").await;
    let club = create_test_group(&server, &bob, "club").await;

    let sent = send_test_invite(&server, &team.id, &alice, &carol).await;
    let received = send_test_invite(&server, &club.id, &bob, &alice).await;

    let list = |who: &quire_storage::AccountId, req: proto::ListInvitesRequest| {
        invites::list_invites(state(&server), caller(who), Rpc(req))
    };

    // No filters: everything the caller sent or received.
    let axum::Json(all) = list(&alice, proto::ListInvitesRequest::default())
        .await
        .unwrap();
    let ids: Vec<_> = all.invites.iter().map(|i| i.id.clone()).collect();
    assert_eq!(ids, vec![sent.id.clone(), received.id.clone()]);

    let axum::Json(mine) = list(
        &alice,
        proto::ListInvitesRequest {
            recipient_account_id: Some(alice.clone()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(mine.invites.len(), 1);
    assert_eq!(mine.invites[0].id, received.id);

    // A group filter shows that group's invites to its members.
    let axum::Json(in_team) = list(
        &alice,
        proto::ListInvitesRequest {
            group_id: Some(team.id.clone()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(in_team.invites.len(), 1);
    assert_eq!(in_team.invites[0].id, sent.id);

    // ...and nothing to outsiders.
    let axum::Json(outside) = list(
        &bob,
        proto::ListInvitesRequest {
            group_id: Some(team.id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(outside.invites.is_empty());

    // Someone else's sent invites are off limits.
    let err = list(
        &bob,
        proto::ListInvitesRequest {
            sender_account_id: Some(alice.clone()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied(_)));
}
