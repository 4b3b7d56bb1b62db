//! Change notifications.
//!
//! The session publishes a small, fixed set of events; views subscribe
//! to the ones they care about. Callbacks run synchronously on the
//! publishing thread, in subscription order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The committed pipeline changed (execute, undo, redo).
    PipelineChanged,
    /// The preview was set or cleared.
    PreviewChanged,
    /// A render is about to start.
    ProcessingStarted,
    /// A render finished.
    ProcessingFinished,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PipelineChanged => f.write_str("pipeline_changed"),
            Self::PreviewChanged => f.write_str("preview_changed"),
            Self::ProcessingStarted => f.write_str("processing_started"),
            Self::ProcessingFinished => f.write_str("processing_finished"),
        }
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn Fn(EventKind) + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    kind: Option<EventKind>,
    callback: Callback,
}

/// Synchronous publish/subscribe over [`EventKind`].
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    /// An empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `callback` whenever `kind` is published.
    pub fn subscribe(
        &mut self,
        kind: EventKind,
        callback: impl Fn(EventKind) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.add(Some(kind), Box::new(callback))
    }

    /// Call `callback` for every published event.
    pub fn subscribe_all(
        &mut self,
        callback: impl Fn(EventKind) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.add(None, Box::new(callback))
    }

    /// Remove a subscription. Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Deliver `kind` to every matching subscriber.
    pub fn publish(&self, kind: EventKind) {
        tracing::trace!(%kind, "publish");
        for subscriber in &self.subscribers {
            if subscriber.kind.is_none_or(|k| k == kind) {
                (subscriber.callback)(kind);
            }
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns `true` if nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    fn add(&mut self, kind: Option<EventKind>, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber { id, kind, callback });
        id
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<EventKind>>>, impl Fn(EventKind) + Send + Sync + 'static) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        (log, move |kind| {
            if let Ok(mut events) = sink.lock() {
                events.push(kind);
            }
        })
    }

    fn events(log: &Mutex<Vec<EventKind>>) -> Vec<EventKind> {
        log.lock().map(|e| e.clone()).unwrap_or_default()
    }

    #[test]
    fn delivers_only_subscribed_kind() {
        let mut bus = EventBus::new();
        let (log, callback) = recorder();
        bus.subscribe(EventKind::PipelineChanged, callback);
        bus.publish(EventKind::PreviewChanged);
        bus.publish(EventKind::PipelineChanged);
        assert_eq!(events(&log), vec![EventKind::PipelineChanged]);
    }

    #[test]
    fn subscribe_all_sees_everything() {
        let mut bus = EventBus::new();
        let (log, callback) = recorder();
        bus.subscribe_all(callback);
        bus.publish(EventKind::ProcessingStarted);
        bus.publish(EventKind::ProcessingFinished);
        assert_eq!(
            events(&log),
            vec![EventKind::ProcessingStarted, EventKind::ProcessingFinished]
        );
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let (log, callback) = recorder();
        let id = bus.subscribe(EventKind::PreviewChanged, callback);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(EventKind::PreviewChanged);
        assert!(events(&log).is_empty());
        assert!(bus.is_empty());
    }

    #[test]
    fn ids_are_unique() {
        let mut bus = EventBus::new();
        let a = bus.subscribe_all(|_| {});
        let b = bus.subscribe_all(|_| {});
        assert_ne!(a, b);
        assert_eq!(bus.len(), 2);
    }
}
