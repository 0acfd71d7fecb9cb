//! Per-user channel table.

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

use super::{Notifier, RequestEvent};

/// Buffered events per user before slow receivers start lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Live channels keyed by user id.
///
/// Each dispatcher owns its own table; nothing is process-global.
pub struct Dispatcher {
    channels: DashMap<String, broadcast::Sender<RequestEvent>>,
    capacity: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Bind a client to the user's channel, creating it on first join.
    ///
    /// Joining again reuses the existing channel, so each event still reaches
    /// the user once per subscription rather than once per join.
    pub fn register(&self, user_id: &str) -> Subscription {
        let receiver = self
            .channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        debug!(user_id, "channel registered");
        Subscription {
            user_id: user_id.to_string(),
            receiver,
        }
    }

    /// Drop the user's channel. Returns `false` if none was registered.
    pub fn unregister(&self, user_id: &str) -> bool {
        let removed = self.channels.remove(user_id).is_some();
        if removed {
            debug!(user_id, "channel removed");
        }
        removed
    }

    pub fn is_connected(&self, user_id: &str) -> bool {
        self.channels
            .get(user_id)
            .is_some_and(|sender| sender.receiver_count() > 0)
    }

    /// Ids of users with a live channel.
    pub fn connected_users(&self) -> Vec<String> {
        self.channels
            .iter()
            .filter(|entry| entry.value().receiver_count() > 0)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Remove channels whose subscriptions have all been dropped.
    pub fn prune(&self) -> usize {
        let before = self.channels.len();
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
        before - self.channels.len()
    }
}

impl Notifier for Dispatcher {
    fn notify_user(&self, user_id: &str, event: RequestEvent) -> bool {
        let name = event.name();
        let delivered = match self.channels.get(user_id) {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        };

        if !delivered {
            debug!(user_id, event = name, "user offline, notification dropped");
            // Disconnected without unregistering; forget the channel.
            self.channels
                .remove_if(user_id, |_, sender| sender.receiver_count() == 0);
        }
        delivered
    }

    fn broadcast(&self, event: RequestEvent) -> usize {
        let reached = self
            .channels
            .iter()
            .filter(|entry| entry.value().send(event.clone()).is_ok())
            .count();
        debug!(event = event.name(), reached, "broadcast sent");
        reached
    }
}

/// Receiving end held by a connected client.
pub struct Subscription {
    user_id: String,
    receiver: broadcast::Receiver<RequestEvent>,
}

impl Subscription {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Next buffered event without blocking, skipping over any lag gap.
    pub fn try_recv(&mut self) -> Option<RequestEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(user_id = %self.user_id, skipped, "subscriber lagged, events dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Block the current thread until the next event, or `None` once the
    /// channel is closed. Must not be called from inside an async runtime.
    pub fn recv_blocking(&mut self) -> Option<RequestEvent> {
        loop {
            match self.receiver.blocking_recv() {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user_id = %self.user_id, skipped, "subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// All events currently buffered.
    pub fn drain(&mut self) -> Vec<RequestEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deleted(id: &str) -> RequestEvent {
        RequestEvent::BloodRequestDeleted { id: id.into() }
    }

    #[test]
    fn test_notify_connected_user() {
        let dispatcher = Dispatcher::new();
        let mut sub = dispatcher.register("u1");

        assert!(dispatcher.notify_user("u1", deleted("r1")));
        assert_eq!(sub.try_recv(), Some(deleted("r1")));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_offline_user_is_dropped_silently() {
        let dispatcher = Dispatcher::new();
        assert!(!dispatcher.notify_user("ghost", deleted("r1")));
    }

    #[test]
    fn test_rejoin_does_not_duplicate_channel() {
        let dispatcher = Dispatcher::new();
        let mut first = dispatcher.register("u1");
        let _second = dispatcher.register("u1");

        assert_eq!(dispatcher.connected_users(), vec!["u1".to_string()]);
        dispatcher.notify_user("u1", deleted("r1"));
        assert_eq!(first.drain().len(), 1);
    }

    #[test]
    fn test_broadcast_reaches_every_user() {
        let dispatcher = Dispatcher::new();
        let mut a = dispatcher.register("a");
        let mut b = dispatcher.register("b");

        assert_eq!(dispatcher.broadcast(deleted("r1")), 2);
        assert_eq!(a.drain(), vec![deleted("r1")]);
        assert_eq!(b.drain(), vec![deleted("r1")]);
    }

    #[test]
    fn test_unregister_and_prune() {
        let dispatcher = Dispatcher::new();
        let _a = dispatcher.register("a");
        let b = dispatcher.register("b");

        assert!(dispatcher.unregister("a"));
        assert!(!dispatcher.unregister("a"));
        assert!(!dispatcher.is_connected("a"));

        drop(b);
        assert!(!dispatcher.is_connected("b"));
        assert_eq!(dispatcher.prune(), 1);
        assert!(dispatcher.connected_users().is_empty());
    }

    #[test]
    fn test_dropped_subscription_is_forgotten_on_notify() {
        let dispatcher = Dispatcher::new();
        drop(dispatcher.register("u1"));

        assert!(!dispatcher.notify_user("u1", deleted("r1")));
        assert_eq!(dispatcher.prune(), 0);
    }

    #[test]
    fn test_independent_dispatchers() {
        let one = Dispatcher::new();
        let two = Dispatcher::new();
        let mut sub = one.register("u1");

        assert!(!two.notify_user("u1", deleted("r1")));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_lagging_subscriber_skips_ahead() {
        let dispatcher = Dispatcher::with_capacity(2);
        let mut sub = dispatcher.register("u1");
        for i in 0..5 {
            dispatcher.notify_user("u1", deleted(&i.to_string()));
        }
        let received = sub.drain();
        assert_eq!(received, vec![deleted("3"), deleted("4")]);
    }

    #[test]
    fn test_recv_blocking_waits_for_event_then_close() {
        let dispatcher = std::sync::Arc::new(Dispatcher::new());
        let mut sub = dispatcher.register("u1");

        let sender = {
            let dispatcher = dispatcher.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(50));
                dispatcher.notify_user("u1", deleted("r1"));
                dispatcher.unregister("u1");
            })
        };

        assert_eq!(sub.recv_blocking(), Some(deleted("r1")));
        sender.join().unwrap();
        assert_eq!(sub.recv_blocking(), None);
    }

    #[test]
    fn test_concurrent_registration() {
        let dispatcher = std::sync::Arc::new(Dispatcher::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let dispatcher = dispatcher.clone();
                std::thread::spawn(move || {
                    let sub = dispatcher.register(&format!("user-{i}"));
                    dispatcher.unregister(&format!("user-{}", i % 2));
                    sub
                })
            })
            .collect();
        let subs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(subs.len(), 8);
        assert!(dispatcher.is_connected("user-7"));
    }
}
