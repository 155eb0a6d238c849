//! Event bus abstraction for quire account lifecycle notifications.
//!
//! The accounts service owns identities; quire only reacts to what happens to
//! them. This crate defines the [`EventBus`] trait those notifications travel
//! over, so the server can run against an in-process bus
//! (`quire-events-memory`) or a shared one without caring which.

use async_trait::async_trait;
use futures::Stream;
use quire_storage::AccountId;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

/// Kind of account lifecycle event
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountEventKind {
    Deleted,
}

/// Something that happened to an account
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountEvent {
    pub kind: AccountEventKind,
    pub account_id: AccountId,
    pub timestamp: i64, // unix millis
}

impl AccountEvent {
    pub fn deleted(account_id: AccountId, timestamp: i64) -> Self {
        Self {
            kind: AccountEventKind::Deleted,
            account_id,
            timestamp,
        }
    }
}

/// Error type for event bus operations
#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("backend error: {0}")]
    Backend(String),
}

/// Stream of account events
pub type EventStream = Pin<Box<dyn Stream<Item = AccountEvent> + Send>>;

/// Publish/subscribe transport for account events.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event to every current subscriber of its kind.
    ///
    /// Publishing with no subscribers is not an error; the event is dropped.
    async fn publish(&self, event: AccountEvent) -> Result<(), EventBusError>;

    /// Subscribe to events of one kind. The stream ends when the bus is dropped.
    async fn subscribe(&self, kind: &AccountEventKind) -> Result<EventStream, EventBusError>;
}
