use std::sync::Arc;

use futures::StreamExt;
use quire_events::{AccountEventKind, EventBus, EventBusError};
use quire_storage::{AccountId, AccountPurge, Store};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::ServiceError;

/// Shared request state: the store, the event bus and policy settings.
#[derive(Clone)]
pub struct QuireServer {
    pub store: Arc<dyn Store>,
    pub events: Arc<dyn EventBus>,
    pub config: ServerConfig,
}

impl QuireServer {
    pub fn new(store: Arc<dyn Store>, events: Arc<dyn EventBus>, config: ServerConfig) -> Self {
        Self {
            store,
            events,
            config,
        }
    }

    /// Remove every trace of a deleted account. Safe to call repeatedly.
    pub async fn purge_account(&self, account_id: &AccountId) -> Result<AccountPurge, ServiceError> {
        let purge = self
            .store
            .purge_account(account_id)
            .await
            .map_err(|e| ServiceError::from_store(e, "account", "account purge conflict"))?;

        if !purge.is_noop() {
            info!(
                account_id = %account_id.0,
                invites = purge.invites_removed,
                links = purge.invite_links_removed,
                workspaces = purge.workspaces_deleted,
                memberships = purge.memberships_removed,
                promoted = purge.admins_promoted,
                orphaned = purge.orphaned_groups_deleted,
                "account purged"
            );
        }
        Ok(purge)
    }

    /// Run the account purge for every `Deleted` event until the bus closes.
    ///
    /// Events published by this process's own `OnAccountDelete` arrive after
    /// the cascade already ran, so the rerun finds nothing to do.
    pub async fn spawn_account_listener(&self) -> Result<JoinHandle<()>, EventBusError> {
        let mut stream = self.events.subscribe(&AccountEventKind::Deleted).await?;
        let server = self.clone();

        Ok(tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if let Err(e) = server.purge_account(&event.account_id).await {
                    // Not retried here; `purge-account` or another event reruns it.
                    error!(account_id = %event.account_id.0, error = %e, "account purge failed");
                }
            }
        }))
    }
}
