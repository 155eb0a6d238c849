//! RPC handlers, organized by domain:
//! - groups: create, create workspace, get, get workspace, update, delete, list
//! - members: update role, remove
//! - invites: send, get, accept, deny, revoke, list
//! - invite_links: generate, get, list, revoke, use
//! - accounts: account deletion cascade
//!
//! Every RPC is a `POST /quire.v1.QuireService/<Method>` with a JSON body and
//! the caller identity in the `x-account-id` header.

pub mod accounts;
pub mod groups;
pub mod invite_links;
pub mod invites;
pub mod members;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tracing::warn;

use crate::error::ServiceError;
use crate::metrics::RequestTimer;
use crate::server::QuireServer;

pub const SERVICE_PREFIX: &str = "/quire.v1.QuireService";

/// Metrics label for requests that matched no route.
const UNMATCHED_METHOD: &str = "unknown";

fn rpc(method: &str) -> String {
    format!("{SERVICE_PREFIX}/{method}")
}

/// Build the RPC router.
pub fn router(server: QuireServer) -> Router {
    Router::new()
        // ───────────────────────────── Groups ─────────────────────────────
        .route(&rpc("CreateGroup"), post(groups::create_group))
        .route(&rpc("CreateWorkspace"), post(groups::create_workspace))
        .route(&rpc("GetGroup"), post(groups::get_group))
        .route(&rpc("GetWorkspace"), post(groups::get_workspace))
        .route(&rpc("UpdateGroup"), post(groups::update_group))
        .route(&rpc("DeleteGroup"), post(groups::delete_group))
        .route(&rpc("ListGroups"), post(groups::list_groups))
        // ───────────────────────────── Members ─────────────────────────────
        .route(&rpc("UpdateMember"), post(members::update_member))
        .route(&rpc("RemoveMember"), post(members::remove_member))
        // ───────────────────────────── Invites ─────────────────────────────
        .route(&rpc("SendInvite"), post(invites::send_invite))
        .route(&rpc("GetInvite"), post(invites::get_invite))
        .route(&rpc("AcceptInvite"), post(invites::accept_invite))
        .route(&rpc("DenyInvite"), post(invites::deny_invite))
        .route(&rpc("RevokeInvite"), post(invites::revoke_invite))
        .route(&rpc("ListInvites"), post(invites::list_invites))
        // ───────────────────────────── Invite Links ─────────────────────────────
        .route(&rpc("GenerateInviteLink"), post(invite_links::generate_invite_link))
        .route(&rpc("GetInviteLink"), post(invite_links::get_invite_link))
        .route(&rpc("ListInviteLinks"), post(invite_links::list_invite_links))
        .route(&rpc("RevokeInviteLink"), post(invite_links::revoke_invite_link))
        .route(&rpc("UseInviteLink"), post(invite_links::use_invite_link))
        // ───────────────────────────── Accounts ─────────────────────────────
        .route(&rpc("OnAccountDelete"), post(accounts::on_account_delete))
        .layer(middleware::from_fn_with_state(server.clone(), observe))
        .with_state(server)
}

/// The RPC method name of a matched route. Raw paths never become labels,
/// so unknown URIs cannot mint new metric series.
fn method_label(matched: Option<&str>) -> &str {
    matched
        .and_then(|path| path.rsplit('/').next())
        .filter(|method| !method.is_empty())
        .unwrap_or(UNMATCHED_METHOD)
}

/// Bound each request by the configured deadline and record metrics.
///
/// A request that runs out of time is dropped mid-flight; any open store
/// transaction rolls back with it.
async fn observe(State(server): State<QuireServer>, req: Request, next: Next) -> Response {
    let matched = req.extensions().get::<MatchedPath>().map(MatchedPath::as_str);
    let method = method_label(matched).to_owned();
    let timer = RequestTimer::new(method.clone());

    match tokio::time::timeout(server.config.request_timeout, next.run(req)).await {
        Ok(resp) => {
            if resp.status().is_success() {
                timer.success();
            } else {
                timer.error(resp.status().as_str());
            }
            resp
        }
        Err(_) => {
            warn!(method = %method, "request deadline exceeded");
            let err = ServiceError::DeadlineExceeded;
            timer.error(err.status().as_str());
            err.into_response()
        }
    }
}
