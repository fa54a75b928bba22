//! Change notifications for connected clients.
//!
//! Publishing is best effort: with no subscribers the event is dropped, and a
//! subscriber that falls more than the channel capacity behind loses the
//! oldest events.

use crate::cart::CartLineView;
use crate::catalog::{CategoryNode, ItemView};
use serde::Serialize;
use tokio::sync::broadcast;

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

/// A catalog, category or cart change.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// The full category tree after a category write.
    CategoriesUpdated(Vec<CategoryNode>),
    /// The full item listing after an item or stock change.
    ItemsUpdated(Vec<ItemView>),
    /// One session's cart after it changed.
    CartUpdated {
        session: String,
        lines: Vec<CartLineView>,
    },
}

/// Wire frame: `{"event": "...", "data": ...}`.
#[derive(Debug, Serialize)]
struct Frame<'a, T: Serialize> {
    event: &'a str,
    data: T,
}

impl ChangeEvent {
    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ChangeEvent::CategoriesUpdated(_) => "update_categories",
            ChangeEvent::ItemsUpdated(_) => "update_items",
            ChangeEvent::CartUpdated { .. } => "update_cart",
        }
    }

    /// Whether a subscriber bound to `session` should receive this event.
    ///
    /// Cart events go only to their own session; everything else is global.
    pub fn visible_to(&self, session: Option<&str>) -> bool {
        match self {
            ChangeEvent::CartUpdated { session: owner, .. } => session == Some(owner.as_str()),
            _ => true,
        }
    }

    /// Serialize to the JSON text frame sent over websockets.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let name = self.name();
        match self {
            ChangeEvent::CategoriesUpdated(tree) => serde_json::to_string(&Frame { event: name, data: tree }),
            ChangeEvent::ItemsUpdated(items) => serde_json::to_string(&Frame { event: name, data: items }),
            ChangeEvent::CartUpdated { lines, .. } => {
                serde_json::to_string(&Frame { event: name, data: lines })
            }
        }
    }
}

/// Broadcast channel for [`ChangeEvent`]s. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Returns how many subscribers will see it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::debug!(event = name, receivers, "event published");
                receivers
            }
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(ChangeEvent::ItemsUpdated(Vec::new())), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        bus.publish(ChangeEvent::CategoriesUpdated(Vec::new()));
        assert_eq!(rx.recv().await.unwrap(), ChangeEvent::CategoriesUpdated(Vec::new()));
    }

    #[test]
    fn test_cart_events_are_session_scoped() {
        let event = ChangeEvent::CartUpdated {
            session: "s1".into(),
            lines: Vec::new(),
        };
        assert!(event.visible_to(Some("s1")));
        assert!(!event.visible_to(Some("s2")));
        assert!(!event.visible_to(None));
        assert!(ChangeEvent::ItemsUpdated(Vec::new()).visible_to(None));
    }

    #[test]
    fn test_frame_shape() {
        let event = ChangeEvent::CartUpdated {
            session: "s1".into(),
            lines: vec![CartLineView {
                id: "i1".into(),
                name: "Ring".into(),
                price: 100.0,
                quantity: 2,
            }],
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["event"], "update_cart");
        assert_eq!(json["data"][0]["quantity"], 2);
        assert!(json.get("session").is_none());
    }
}
