use tokio::sync::broadcast;

use crate::dto::events::ServerEvent;

/// Capability used by the mutation path to fan out committed changes.
pub trait Broadcaster: Send + Sync {
    /// Deliver `event` to current subscribers. Never blocks and never fails.
    fn publish(&self, event: ServerEvent);
}

/// Broadcast hub backed by a Tokio broadcast channel, shared by the WebSocket and SSE transports.
pub struct EventHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Broadcaster for EventHub {
    fn publish(&self, event: ServerEvent) {
        // No receivers is not an error: nobody is watching.
        let _ = self.sender.send(event);
    }
}

/// Broadcaster that drops every event.
pub struct NoopBroadcaster;

impl Broadcaster for NoopBroadcaster {
    fn publish(&self, _event: ServerEvent) {}
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn hub_delivers_to_every_subscriber() {
        let hub = EventHub::new(4);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();
        assert_eq!(hub.receiver_count(), 2);

        hub.publish(ServerEvent::json("scoreUpdate", Some("M1".into()), &json!({"a": 1})).unwrap());

        assert_eq!(first.recv().await.unwrap().event, "scoreUpdate");
        assert_eq!(second.recv().await.unwrap().match_id.as_deref(), Some("M1"));
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let hub = EventHub::new(4);
        hub.publish(ServerEvent::json("matchCreated", None, &json!({})).unwrap());
        NoopBroadcaster.publish(ServerEvent::json("matchCreated", None, &json!({})).unwrap());
    }
}
