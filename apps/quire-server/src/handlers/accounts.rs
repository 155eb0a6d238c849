//! Account deletion cascade, as an RPC.
//!
//! After the cascade lands the handler publishes `AccountEvent::Deleted`, so
//! every subscriber on the bus (including other replicas' account listeners
//! on a shared bus) converges. The `purge-account` admin command runs the
//! same cascade offline.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use quire_events::AccountEvent;
use tracing::warn;

use crate::auth::{Caller, Rpc};
use crate::error::ServiceError;
use crate::proto;
use crate::server::QuireServer;

/// An account may only trigger the cascade for itself.
pub async fn on_account_delete(
    State(server): State<QuireServer>,
    Caller(caller): Caller,
    Rpc(req): Rpc<proto::OnAccountDeleteRequest>,
) -> Result<Json<proto::AccountPurgeResponse>, ServiceError> {
    if req.account_id != caller {
        return Err(ServiceError::PermissionDenied(
            "cannot delete another account".into(),
        ));
    }
    let purge = server.purge_account(&req.account_id).await?;

    // Best effort once the cascade has landed.
    let event = AccountEvent::deleted(req.account_id.clone(), Utc::now().timestamp_millis());
    if let Err(e) = server.events.publish(event).await {
        warn!(account_id = %req.account_id.0, error = %e, "failed to publish account deletion");
    }

    Ok(Json(purge.into()))
}
