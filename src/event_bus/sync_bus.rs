//! Synchronous, topic-keyed, registration-order event bus (spec §4.1).
//!
//! This diverges from a broadcast-channel design: dispatch happens
//! synchronously on the emitter's own stack, handlers run in the order they
//! were registered, and a panicking handler is caught so it cannot take down
//! its siblings. See DESIGN.md for why this replaces a multi-consumer
//! broadcast channel.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::traits::{AppEvent, Handler};

/// Token returned by [`EventBus::subscribe`], used to [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    handler: Handler,
}

#[derive(Default)]
pub struct EventBus {
    topics: RwLock<HashMap<&'static str, Vec<Subscription>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `handler` for `event.topic()`'s topic string; returns a token
    /// for [`unsubscribe`]. Subscriptions for a topic are stored in
    /// registration order and dispatched in that order.
    pub fn subscribe(&self, topic: &'static str, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut topics = self.topics.write().expect("event bus lock poisoned");
        topics.entry(topic).or_default().push(Subscription { id, handler });
        id
    }

    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool {
        let mut topics = self.topics.write().expect("event bus lock poisoned");
        if let Some(subs) = topics.get_mut(topic) {
            let before = subs.len();
            subs.retain(|s| s.id != id);
            return subs.len() != before;
        }
        false
    }

    pub fn listener_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .expect("event bus lock poisoned")
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Invoke every handler registered for `event`'s topic, in registration
    /// order. A handler that panics is caught and logged; sibling handlers
    /// still run (spec §4.1).
    pub fn publish(&self, event: AppEvent) {
        let topic = event.topic();
        // Handlers that add/remove subscriptions mid-dispatch only affect the
        // next emission (spec §5): we hold the read guard for this emission's
        // full duration rather than detaching a snapshot.
        let topics = self.topics.read().expect("event bus lock poisoned");
        if let Some(subs) = topics.get(topic) {
            for sub in subs {
                if let Err(panic) = catch_unwind(AssertUnwindSafe(|| (sub.handler)(&event))) {
                    log::error!("event_bus: handler for topic '{topic}' panicked: {panic:?}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(RwLock::new(Vec::<u32>::new()));
        let o1 = Arc::clone(&order);
        let o2 = Arc::clone(&order);
        bus.subscribe("session.created", Box::new(move |_| o1.write().unwrap().push(1)));
        bus.subscribe("session.created", Box::new(move |_| o2.write().unwrap().push(2)));
        bus.publish(AppEvent::SessionCreated { session_id: "s1".into() });
        assert_eq!(*order.read().unwrap(), vec![1, 2]);
    }

    #[test]
    fn panicking_handler_does_not_abort_siblings() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        bus.subscribe("session.created", Box::new(|_| panic!("boom")));
        bus.subscribe("session.created", Box::new(move |_| { c.fetch_add(1, Ordering::SeqCst); }));
        bus.publish(AppEvent::SessionCreated { session_id: "s1".into() });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let id = bus.subscribe("session.created", Box::new(move |_| { c.fetch_add(1, Ordering::SeqCst); }));
        bus.unsubscribe("session.created", id);
        bus.publish(AppEvent::SessionCreated { session_id: "s1".into() });
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_count_reflects_subscriptions() {
        let bus = EventBus::new();
        assert_eq!(bus.listener_count("session.created"), 0);
        bus.subscribe("session.created", Box::new(|_| {}));
        bus.subscribe("session.created", Box::new(|_| {}));
        assert_eq!(bus.listener_count("session.created"), 2);
    }

    #[test]
    fn tolerates_many_concurrent_listeners() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..64 {
            let c = Arc::clone(&count);
            bus.subscribe("agent.thinking", Box::new(move |_| { c.fetch_add(1, Ordering::SeqCst); }));
        }
        bus.publish(AppEvent::AgentThinking { session_id: "s1".into() });
        assert_eq!(count.load(Ordering::SeqCst), 64);
    }

    #[test]
    fn other_topics_are_unaffected() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        bus.subscribe("session.created", Box::new(move |_| { c.fetch_add(1, Ordering::SeqCst); }));
        bus.publish(AppEvent::SessionIdle { session_id: "s1".into() });
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
