//! Change subscription: a per-tree fan-out hub.
//!
//! Every successful write or removal publishes a [`SeedEvent`]; subscribers
//! register a filter and receive matching events on a broadcast channel.
//! Subscribers whose receivers are gone are pruned on the next publish.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use grove_types::Name;

/// What happened to a seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedEventKind {
    /// Field contents changed under one tab.
    Updated,
    /// One seed was removed or cleared.
    SeedRemoved,
    /// The whole pod was removed.
    PodRemoved,
}

/// One change notification from a tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEvent {
    pub key: String,
    /// The affected tab; `None` for whole-pod events.
    pub tab: Option<Name>,
    pub kind: SeedEventKind,
}

/// Filter for subscribing to a subset of a tree's events.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// If set, only events for this key are delivered.
    pub key: Option<String>,
    /// If set, only events for this tab are delivered.
    pub tab: Option<Name>,
    /// If set, only these kinds are delivered.
    pub kinds: Option<Vec<SeedEventKind>>,
}

impl EventFilter {
    /// Returns `true` if `event` matches this filter.
    pub fn matches(&self, event: &SeedEvent) -> bool {
        if let Some(ref key) = self.key {
            if *key != event.key {
                return false;
            }
        }
        if let Some(ref tab) = self.tab {
            if event.tab.as_ref() != Some(tab) {
                return false;
            }
        }
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        true
    }
}

/// A broadcast receiver for seed events.
pub type EventStream = broadcast::Receiver<SeedEvent>;

struct Subscriber {
    filter: EventFilter,
    sender: broadcast::Sender<SeedEvent>,
}

/// Fan-out router owned by each tree.
pub struct ChangeHub {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeHub {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register a subscriber; `capacity` bounds the per-subscriber queue.
    pub fn subscribe(&self, filter: EventFilter, capacity: usize) -> EventStream {
        let (tx, rx) = broadcast::channel(capacity.max(1));
        self.subscribers
            .write()
            .expect("hub lock poisoned")
            .push(Subscriber { filter, sender: tx });
        rx
    }

    /// Deliver `event` to all matching subscribers, pruning closed ones.
    pub fn publish(&self, event: &SeedEvent) {
        let mut subs = self.subscribers.write().expect("hub lock poisoned");
        if subs.is_empty() {
            return;
        }
        subs.retain(|sub| {
            if sub.filter.matches(event) {
                // A failed send means no receivers remain: stale subscriber.
                sub.sender.send(event.clone()).is_ok()
            } else {
                sub.sender.receiver_count() > 0
            }
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().expect("hub lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(key: &str, tab: Option<&str>, kind: SeedEventKind) -> SeedEvent {
        SeedEvent {
            key: key.to_string(),
            tab: tab.map(|t| Name::new(t).unwrap()),
            kind,
        }
    }

    #[test]
    fn filter_matching() {
        let all = EventFilter::default();
        assert!(all.matches(&event("2330", Some("Base"), SeedEventKind::Updated)));

        let keyed = EventFilter {
            key: Some("2330".into()),
            ..Default::default()
        };
        assert!(keyed.matches(&event("2330", None, SeedEventKind::PodRemoved)));
        assert!(!keyed.matches(&event("2317", None, SeedEventKind::PodRemoved)));

        let kinds = EventFilter {
            kinds: Some(vec![SeedEventKind::PodRemoved]),
            ..Default::default()
        };
        assert!(!kinds.matches(&event("x", None, SeedEventKind::Updated)));
    }

    #[test]
    fn publish_delivers_and_prunes() {
        let hub = ChangeHub::new();
        let mut rx = hub.subscribe(EventFilter::default(), 8);
        let dropped = hub.subscribe(EventFilter::default(), 8);
        drop(dropped);

        let ev = event("2330", Some("Base"), SeedEventKind::Updated);
        hub.publish(&ev);
        assert_eq!(rx.try_recv().unwrap(), ev);
        assert_eq!(hub.subscriber_count(), 1);
    }
}
