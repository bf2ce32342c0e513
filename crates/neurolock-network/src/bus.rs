use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use neurolock_types::{events::AttemptEvent, Result};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: AttemptEvent) -> Result<()>;
    fn subscribe(&self) -> BoxStream<'static, AttemptEvent>;
}

/// In-process bus backed by a broadcast channel.
#[derive(Clone)]
pub struct BroadcastBus {
    tx: broadcast::Sender<AttemptEvent>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }
}

#[async_trait]
impl EventBus for BroadcastBus {
    async fn publish(&self, event: AttemptEvent) -> Result<()> {
        // No subscribers is not an error.
        if self.tx.send(event).is_err() {
            debug!("Attempt event dropped: no subscribers");
        }
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, AttemptEvent> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|event| async move { event.ok() })
            .boxed()
    }
}
