//! Holds the two routing tables a session needs: pending responses keyed by outbound id, and
//! event subscribers keyed by method name. See the component design for the dispatch policy
//! this implements.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fnv::FnvHashMap;
use tokio::sync::{mpsc, oneshot, Mutex};

use cdp_types::{CallId, JsonEventMessage, MethodId, Response};

use crate::error::CdpError;

/// Per-subscriber inbound event buffer. A slow subscriber drops its own events past this depth;
/// it never blocks the reader or any other subscriber.
const SUBSCRIBER_CHANNEL_CAPACITY: usize = 128;

/// Identifies one subscriber within its method's bucket, so an explicit unsubscribe can remove
/// exactly that entry without disturbing the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SubscriberId(u64);

struct Subscriber {
    id: SubscriberId,
    sink: mpsc::Sender<JsonEventMessage>,
    dropped: Arc<AtomicU64>,
}

/// The receiving half of an event subscription, plus a live counter of events dropped because
/// this subscriber's buffer was full.
///
/// Dropping a `Subscription` closes its channel; the router notices and removes the stale entry
/// the next time it dispatches an event for that method. Calling [`Subscription::unsubscribe`]
/// removes it immediately instead of waiting for the next event.
pub struct Subscription {
    pub events: mpsc::Receiver<JsonEventMessage>,
    dropped: Arc<AtomicU64>,
    router: Router,
    method: MethodId,
    id: SubscriberId,
}

impl Subscription {
    /// Number of events dropped for this subscriber so far because its buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Removes this subscriber from the router's table immediately, without affecting any other
    /// subscriber of the same (or any other) method. Equivalent to dropping the `Subscription`,
    /// except it takes effect before the next event arrives rather than on it.
    pub async fn unsubscribe(self) {
        self.router.unsubscribe(&self.method, self.id).await;
    }
}

#[derive(Default)]
struct Tables {
    pending: FnvHashMap<CallId, oneshot::Sender<Result<Response, CdpError>>>,
    subscribers: HashMap<MethodId, Vec<Subscriber>>,
    next_subscriber_id: u64,
}

/// Routes inbound envelopes to the right waiter. Cheap to clone; every clone shares the same
/// underlying tables.
#[derive(Clone, Default)]
pub struct Router {
    tables: Arc<Mutex<Tables>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `id -> sink` before the writer puts the corresponding bytes on the wire. Must
    /// happen-before the write; otherwise a fast response could arrive before the entry exists.
    pub async fn register_pending(&self, id: CallId, sink: oneshot::Sender<Result<Response, CdpError>>) {
        self.tables.lock().await.pending.insert(id, sink);
    }

    /// Fails and removes a pending entry directly, used when the writer itself fails to send.
    pub async fn fail_pending(&self, id: CallId, err: CdpError) {
        if let Some(sink) = self.tables.lock().await.pending.remove(&id) {
            let _ = sink.send(Err(err));
        }
    }

    /// Registers a new subscriber for `method`, returning the receiving half.
    pub async fn subscribe(&self, method: MethodId) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let dropped = Arc::new(AtomicU64::new(0));

        let mut tables = self.tables.lock().await;
        let id = SubscriberId(tables.next_subscriber_id);
        tables.next_subscriber_id += 1;
        tables.subscribers.entry(method.clone()).or_default().push(Subscriber { id, sink: tx, dropped: dropped.clone() });
        drop(tables);

        Subscription { events: rx, dropped, router: self.clone(), method, id }
    }

    /// Removes exactly one subscriber from `method`'s bucket, identified by the id `subscribe`
    /// minted for it. A no-op if it was already removed (explicit unsubscribe racing teardown).
    async fn unsubscribe(&self, method: &MethodId, id: SubscriberId) {
        let mut tables = self.tables.lock().await;
        if let Some(subs) = tables.subscribers.get_mut(method) {
            subs.retain(|sub| sub.id != id);
        }
    }

    /// Dispatches one decoded inbound envelope: a response is delivered to its single waiting
    /// sink and the pending entry removed; an event is fanned out to every current subscriber
    /// for its method, in registration order, best-effort per subscriber.
    pub async fn dispatch(&self, message: cdp_types::Message<JsonEventMessage>) {
        match message {
            cdp_types::Message::Response(resp) => {
                let sink = self.tables.lock().await.pending.remove(&resp.id);
                if let Some(sink) = sink {
                    let _ = sink.send(Ok(resp));
                }
                // else: stale response, the requester already cancelled. Nothing to do.
            }
            cdp_types::Message::Event(event) => {
                let mut tables = self.tables.lock().await;
                if let Some(subs) = tables.subscribers.get_mut(&event.method) {
                    subs.retain(|sub| {
                        match sub.sink.try_send(event.clone()) {
                            Ok(()) => true,
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                let count = sub.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                                tracing::warn!(method = %event.method, dropped = count, "subscriber buffer full, dropping event");
                                true
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => false,
                        }
                    });
                }
            }
        }
    }

    /// Fails every still-pending response with `SessionCancelled` and drops every subscriber
    /// sink, closing their streams. Called once, when the session enters `Stopping`.
    pub async fn shutdown(&self) {
        let mut tables = self.tables.lock().await;
        for (_, sink) in tables.pending.drain() {
            let _ = sink.send(Err(CdpError::SessionCancelled));
        }
        tables.subscribers.clear();
    }
}
