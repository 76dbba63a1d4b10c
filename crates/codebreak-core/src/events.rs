//! Typed event bus.
//!
//! Every cross-component notification flows through an explicitly constructed
//! [`EventBus`] instance that is injected into each component at construction
//! time. Observers receive value snapshots, never references into live
//! mutable state.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error};

use crate::profile::{NotificationType, Profile};
use crate::timer::{Phase, TimerState};

/// Every state change in the system produces an Event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    ProfileChanged {
        /// The previously selected profile, when the change was a switch.
        old: Option<Profile>,
        profile: Profile,
        at: DateTime<Utc>,
    },
    TimerTick {
        remaining_seconds: u32,
        at: DateTime<Utc>,
    },
    TimerStateChanged {
        state: TimerState,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        /// The reminder chosen for this completion.
        notification: NotificationType,
        /// The phase just entered.
        phase: Phase,
        /// Duration of the entered phase in seconds.
        duration_seconds: u32,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ProfileChanged { .. } => EventKind::ProfileChanged,
            Event::TimerTick { .. } => EventKind::TimerTick,
            Event::TimerStateChanged { .. } => EventKind::TimerStateChanged,
            Event::TimerCompleted { .. } => EventKind::TimerCompleted,
        }
    }
}

/// Discriminant used to key subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ProfileChanged,
    TimerTick,
    TimerStateChanged,
    TimerCompleted,
}

type Handler = dyn Fn(&Event) + Send + Sync;

/// Token returned by [`EventBus::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

/// Synchronous publish/subscribe keyed by event kind.
///
/// Handlers run in subscription order. A panicking handler is caught and
/// logged so it cannot block delivery to the remaining handlers.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<EventKind, Vec<(u64, Arc<Handler>)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = lock(&self.subscribers);
        subscribers
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription { kind, id }
    }

    /// Remove a previously registered handler. Unsubscribing twice is a no-op.
    pub fn unsubscribe(&self, subscription: Subscription) {
        let mut subscribers = lock(&self.subscribers);
        if let Some(handlers) = subscribers.get_mut(&subscription.kind) {
            handlers.retain(|(id, _)| *id != subscription.id);
            if handlers.is_empty() {
                subscribers.remove(&subscription.kind);
            }
        }
    }

    /// Deliver an event to every current subscriber of its kind.
    ///
    /// No subscribers is not an error; publishing is then a no-op.
    pub fn publish(&self, event: Event) {
        // Snapshot the handler list so handlers may subscribe or publish
        // reentrantly without deadlocking on the registration lock.
        let handlers: Vec<Arc<Handler>> = {
            let subscribers = lock(&self.subscribers);
            match subscribers.get(&event.kind()) {
                Some(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => {
                    debug!(kind = ?event.kind(), "no subscribers for event");
                    return;
                }
            }
        };

        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                error!(kind = ?event.kind(), "event handler panicked; continuing delivery");
            }
        }
    }

    /// Number of handlers registered for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        lock(&self.subscribers)
            .get(&kind)
            .map_or(0, |handlers| handlers.len())
    }

    /// Drop every subscription.
    pub fn clear(&self) {
        lock(&self.subscribers).clear();
    }
}

// A poisoned registration lock still holds a consistent subscriber list.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
