//! Account deletion handler tests.

use super::super::common::*;
use crate::auth::Rpc;
use crate::error::ServiceError;
use crate::handlers::{accounts, groups};
use crate::proto;
use futures::StreamExt;
use quire_events::{AccountEventKind, EventBus};
use quire_storage::Store;
use std::time::Duration;

#[tokio::test]
async fn handler_account_delete_only_self() {
    let server = create_test_server().await;
    let victim = account();
    create_test_workspace(&server, &victim).await;

    let err = accounts::on_account_delete(
        state(&server),
        caller(&account()),
        Rpc(proto::OnAccountDeleteRequest {
            account_id: victim.clone(),
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ServiceError::PermissionDenied(_)));
    assert!(server.store.get_workspace(&victim).await.is_ok());
}

#[tokio::test]
async fn handler_account_delete_cascades() {
    let server = create_test_server().await;
    let leaving = account();
    let stays = account();
    let guest = account();

    create_test_workspace(&server, &leaving).await;
    // Shared group: `stays` inherits the admin role.
    let shared = create_test_group(&server, &leaving, "shared").await;
    join_via_invite(&server, &shared.id, &leaving, &stays).await;
    send_test_invite(&server, &shared.id, &leaving, &guest).await;
    generate_test_link(&server, &shared.id, &leaving).await;
    // Solo group: deleted with its only member.
    let solo = create_test_group(&server, &leaving, "solo").await;

    let axum::Json(purge) = accounts::on_account_delete(
        state(&server),
        caller(&leaving),
        Rpc(proto::OnAccountDeleteRequest {
            account_id: leaving.clone(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(purge.invites_removed, 1);
    assert_eq!(purge.invite_links_removed, 1);
    assert_eq!(purge.workspaces_deleted, 1);
    assert_eq!(purge.memberships_removed, 2);
    assert_eq!(purge.admins_promoted, 1);
    assert_eq!(purge.orphaned_groups_deleted, 1);

    let g = load_group(&server, &shared.id, &stays).await;
    assert_eq!(g.members.len(), 1);
    assert!(g.is_admin(&stays));
    assert!(g.invites.is_empty());

    let err = groups::get_group(
        state(&server),
        caller(&leaving),
        Rpc(proto::GetGroupRequest { group_id: solo.id }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // Running it again finds nothing left.
    let axum::Json(again) = accounts::on_account_delete(
        state(&server),
        caller(&leaving),
        Rpc(proto::OnAccountDeleteRequest {
            account_id: leaving.clone(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(again.memberships_removed, 0);
    assert_eq!(again.workspaces_deleted, 0);
    assert_eq!(again.admins_promoted, 0);
}

#[tokio::test]
async fn handler_account_delete_publishes_deleted_event() {
    let server = create_test_server().await;
    let leaving = account();
    let mut events = server
        .events
        .subscribe(&AccountEventKind::Deleted)
        .await
        .unwrap();

    // Refused requests announce nothing.
    accounts::on_account_delete(
        state(&server),
        caller(&account()),
        Rpc(proto::OnAccountDeleteRequest {
            account_id: leaving.clone(),
        }),
    )
    .await
    .unwrap_err();

    accounts::on_account_delete(
        state(&server),
        caller(&leaving),
        Rpc(proto::OnAccountDeleteRequest {
            account_id: leaving.clone(),
        }),
    )
    .await
    .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), events.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.kind, AccountEventKind::Deleted);
    assert_eq!(event.account_id, leaving);
}
