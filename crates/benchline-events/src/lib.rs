//! Per-session event fan-out for the Benchline platform.
//!
//! The [`Broadcaster`] maps session ids to sets of live subscribers. Each
//! subscriber hands over a bounded `mpsc` sender at registration time; the
//! WebSocket layer owns the receiving half and forwards queued frames to the
//! socket. Publishing serialises one frame per event and `try_send`s it to
//! every subscriber of the owning session, so one slow or dead connection
//! never blocks delivery to the rest.

use benchline_types::EventPayload;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Capacity of each subscriber's outbound frame queue.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

/// Opaque handle identifying one subscriber registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

type SubscriberMap = HashMap<String, HashMap<SubscriberId, mpsc::Sender<String>>>;

/// The wire frame sent for every broadcast event.
#[derive(Serialize)]
struct Frame<'a> {
    event: &'static str,
    session_id: &'a str,
    data: serde_json::Value,
}

/// Manages live WebSocket subscribers, keyed by session id.
#[derive(Clone, Default)]
pub struct Broadcaster {
    subscribers: Arc<RwLock<SubscriberMap>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber for a session and returns its handle.
    pub async fn subscribe(&self, session_id: &str, sender: mpsc::Sender<String>) -> SubscriberId {
        let id = SubscriberId(Uuid::new_v4());
        let mut subscribers = self.subscribers.write().await;
        subscribers
            .entry(session_id.to_string())
            .or_default()
            .insert(id, sender);
        tracing::debug!(session_id, subscriber_id = %id.0, "subscriber registered");
        id
    }

    /// Removes a subscriber. Idempotent: removing an already removed
    /// subscriber is a no-op, so socket-close cleanup and failed-delivery
    /// cleanup can race without harm. The per-session set is dropped once
    /// it becomes empty.
    pub async fn unsubscribe(&self, session_id: &str, id: SubscriberId) {
        let mut subscribers = self.subscribers.write().await;
        if let Some(set) = subscribers.get_mut(session_id) {
            set.remove(&id);
            if set.is_empty() {
                subscribers.remove(session_id);
            }
        }
    }

    /// Publishes one event to every subscriber of a session.
    ///
    /// The subscriber set is snapshotted before sending, so a subscriber
    /// joining mid-publish may miss this event. A failed `try_send` counts
    /// as a disconnect: the subscriber is removed and delivery to the rest
    /// continues. Publishing to a session with no subscribers is a no-op.
    pub async fn publish(&self, session_id: &str, payload: &EventPayload) {
        let frame = Frame {
            event: payload.event_type(),
            session_id,
            data: payload.data(),
        };
        let message = match serde_json::to_string(&frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(session_id, event = frame.event, "frame serialization failed: {e}");
                return;
            }
        };

        let snapshot: Vec<(SubscriberId, mpsc::Sender<String>)> = {
            let subscribers = self.subscribers.read().await;
            match subscribers.get(session_id) {
                Some(set) => set.iter().map(|(id, tx)| (*id, tx.clone())).collect(),
                None => return,
            }
        };

        let mut dead = Vec::new();
        for (id, sender) in snapshot {
            if let Err(e) = sender.try_send(message.clone()) {
                tracing::warn!(
                    session_id,
                    subscriber_id = %id.0,
                    "dropping subscriber after failed send: {e}"
                );
                dead.push(id);
            }
        }
        for id in dead {
            self.unsubscribe(session_id, id).await;
        }
    }

    /// Sends a pre-serialised frame to one subscriber only.
    pub async fn send_to(&self, session_id: &str, id: SubscriberId, message: String) {
        let subscribers = self.subscribers.read().await;
        if let Some(sender) = subscribers.get(session_id).and_then(|set| set.get(&id)) {
            if let Err(e) = sender.try_send(message) {
                tracing::warn!(
                    session_id,
                    subscriber_id = %id.0,
                    "dropping direct message for slow consumer: {e}"
                );
            }
        }
    }

    /// Number of live subscribers for a session.
    pub async fn subscriber_count(&self, session_id: &str) -> usize {
        let subscribers = self.subscribers.read().await;
        subscribers.get(session_id).map_or(0, HashMap::len)
    }
}
