use tokio::sync::broadcast;
use tracing::trace;

use crate::dto::sse::ServerEvent;

/// Fan-out of public events (roster, countdown, status) to every open page.
///
/// Slow pages lag and skip events; every event carries full state so the next
/// one catches them up.
#[derive(Clone)]
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send to current subscribers. With no page connected the event is dropped.
    pub fn broadcast(&self, event: ServerEvent) {
        match self.sender.send(event) {
            Ok(listeners) => trace!(listeners, "public event sent"),
            Err(_) => trace!("public event dropped; no listeners"),
        }
    }
}
