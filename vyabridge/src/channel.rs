//! Named, in-process publish/subscribe channel.
//!
//! A publish runs every current handler synchronously, in subscription order,
//! before returning. Nothing is buffered: a late subscriber never sees past
//! messages. Handlers are invoked from a snapshot of the subscriber list, so a
//! handler may publish on the same channel or drop its own subscription.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::server::ServerLink;

type Handler<M> = Arc<dyn Fn(&M) + Send + Sync>;

struct ChannelInner<M> {
    name: &'static str,
    // ids are handed out in increasing order, so key order is subscription order
    handlers: RwLock<BTreeMap<u64, Handler<M>>>,
    cb_counter: AtomicU64,
}

/// Cloneable handle to one named channel.
pub struct EventChannel<M> {
    inner: Arc<ChannelInner<M>>,
}

impl<M> Clone for EventChannel<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: 'static> EventChannel<M> {
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                name,
                handlers: RwLock::new(BTreeMap::new()),
                cb_counter: AtomicU64::new(1),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.read().len()
    }

    /// Registers `handler` for every future publish.
    ///
    /// The returned [`Subscription`] removes the handler when dropped or when
    /// [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        let id = self.inner.cb_counter.fetch_add(1, Ordering::Relaxed);
        self.inner.handlers.write().insert(id, Arc::new(handler));
        debug!(channel = self.inner.name, subscriber = id, "subscribed");

        let weak: Weak<ChannelInner<M>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.handlers.write().remove(&id);
                debug!(channel = inner.name, subscriber = id, "unsubscribed");
            }
        })
    }

    /// Delivers `message` to every current subscriber and returns how many
    /// handlers ran. A panicking handler is logged and skipped; the others
    /// still run.
    pub fn publish(&self, message: &M) -> usize {
        let snapshot: Vec<(u64, Handler<M>)> = self
            .inner
            .handlers
            .read()
            .iter()
            .map(|(id, h)| (*id, Arc::clone(h)))
            .collect();

        for (id, handler) in &snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(message))).is_err() {
                error!(
                    channel = self.inner.name,
                    subscriber = id,
                    "subscriber panicked, continuing with the remaining subscribers"
                );
            }
        }
        snapshot.len()
    }
}

impl<M: Serialize + 'static> EventChannel<M> {
    /// Publishes locally, then relays the same payload to `target` on the
    /// server under the channel name.
    ///
    /// A failed relay is logged; local subscribers have already run.
    pub fn publish_and_forward(&self, message: &M, server: &dyn ServerLink, target: &str) -> usize {
        let delivered = self.publish(message);

        match serde_json::to_value(message) {
            Ok(payload) => {
                if let Err(e) = server.push_event_to(target, self.inner.name, payload) {
                    warn!(channel = self.inner.name, to = target, "forward failed: {}", e);
                }
            }
            Err(e) => warn!(channel = self.inner.name, "cannot serialize payload: {}", e),
        }
        delivered
    }
}

/// Handle returned by [`EventChannel::subscribe`].
pub struct Subscription {
    detach: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Mutex::new(Some(Box::new(detach))),
        }
    }

    /// Removes the handler. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        let detach = self.detach.lock().take();
        if let Some(detach) = detach {
            detach();
        }
    }

    pub fn is_active(&self) -> bool {
        self.detach.lock().is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let channel: EventChannel<u32> = EventChannel::new("empty");
        assert_eq!(channel.publish(&1), 0);
    }

    #[test]
    fn test_subscription_order_is_invocation_order() {
        let channel: EventChannel<u32> = EventChannel::new("ordered");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let subs: Vec<Subscription> = (0..3)
            .map(|i| {
                let seen = Arc::clone(&seen);
                channel.subscribe(move |v: &u32| seen.lock().push((i, *v)))
            })
            .collect();

        assert_eq!(channel.publish(&7), 3);
        assert_eq!(*seen.lock(), vec![(0, 7), (1, 7), (2, 7)]);
        drop(subs);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let channel: EventChannel<u32> = EventChannel::new("idem");
        let hits = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&hits);
        let sub = channel.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        channel.publish(&1);
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        channel.publish(&2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let channel: EventChannel<u32> = EventChannel::new("isolated");
        let hits = Arc::new(AtomicU64::new(0));

        let _boom = channel.subscribe(|_| panic!("handler failure"));
        let counter = Arc::clone(&hits);
        let _ok = channel.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(channel.publish(&1), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_can_republish_on_same_channel() {
        let channel: EventChannel<u32> = EventChannel::new("reentrant");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let republisher = channel.clone();
        let _echo = channel.subscribe(move |v: &u32| {
            if *v == 0 {
                republisher.publish(&1);
            }
        });
        let sink = Arc::clone(&seen);
        let _sink = channel.subscribe(move |v: &u32| sink.lock().push(*v));

        channel.publish(&0);
        // the nested publish completes before the outer loop reaches the sink
        assert_eq!(*seen.lock(), vec![1, 0]);
    }

    #[test]
    fn test_late_subscriber_gets_no_history() {
        let channel: EventChannel<u32> = EventChannel::new("history");
        channel.publish(&1);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = channel.subscribe(move |v: &u32| sink.lock().push(*v));
        assert!(seen.lock().is_empty());
    }
}
