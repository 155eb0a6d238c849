//! In-memory event bus implementation using tokio broadcast channels.
//!
//! Suitable for single-process deployments and tests. Replicas do not see
//! each other's events.

use async_trait::async_trait;
use dashmap::DashMap;
use quire_events::{AccountEvent, AccountEventKind, EventBus, EventBusError, EventStream};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

const CHANNEL_CAPACITY: usize = 100;

/// In-memory event bus with one broadcast channel per event kind.
pub struct MemoryEventBus {
    channels: Arc<DashMap<AccountEventKind, broadcast::Sender<AccountEvent>>>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
        }
    }

    fn get_or_create_channel(&self, kind: &AccountEventKind) -> broadcast::Sender<AccountEvent> {
        self.channels
            .entry(kind.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: AccountEvent) -> Result<(), EventBusError> {
        let tx = self.get_or_create_channel(&event.kind);

        // No receivers is fine
        let _ = tx.send(event);

        Ok(())
    }

    async fn subscribe(&self, kind: &AccountEventKind) -> Result<EventStream, EventBusError> {
        let rx = self.get_or_create_channel(kind).subscribe();

        // Lagged receivers skip what they missed.
        let stream = BroadcastStream::new(rx).filter_map(|r| r.ok());

        Ok(Box::pin(stream))
    }
}
