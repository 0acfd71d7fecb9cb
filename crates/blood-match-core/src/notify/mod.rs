//! Real-time notification fan-out.
//!
//! Delivery is best-effort: events for users without a live channel are
//! dropped, nothing is queued.

mod dispatcher;
mod events;

pub use dispatcher::*;
pub use events::*;

/// Publishing side of the notification transport.
pub trait Notifier: Send + Sync {
    /// Deliver to one user's channel. Returns `false` if the user is offline.
    fn notify_user(&self, user_id: &str, event: RequestEvent) -> bool;

    /// Deliver to every connected user. Returns the number of channels reached.
    fn broadcast(&self, event: RequestEvent) -> usize;
}

/// Where a recorded event was sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    User(String),
    Broadcast,
}

/// Notifier that records every event instead of delivering it (for testing).
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: std::sync::Mutex<Vec<(Delivery, RequestEvent)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<(Delivery, RequestEvent)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Recipients of `notify_user` calls, in order.
    pub fn notified_users(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|(delivery, _)| match delivery {
                Delivery::User(id) => Some(id),
                Delivery::Broadcast => None,
            })
            .collect()
    }

    /// Events passed to `broadcast`, in order.
    pub fn broadcasts(&self) -> Vec<RequestEvent> {
        self.sent()
            .into_iter()
            .filter(|(delivery, _)| *delivery == Delivery::Broadcast)
            .map(|(_, event)| event)
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }

    fn record(&self, delivery: Delivery, event: RequestEvent) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((delivery, event));
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify_user(&self, user_id: &str, event: RequestEvent) -> bool {
        self.record(Delivery::User(user_id.to_string()), event);
        true
    }

    fn broadcast(&self, event: RequestEvent) -> usize {
        self.record(Delivery::Broadcast, event);
        1
    }
}
