//! Debounced auto-save pipeline.
//!
//! Registry mutations mark a shared [`DirtyFlag`]; a background poll task
//! checks it every 100ms and flushes once half a second has passed without a
//! new mark. A flush commits the pending draft, persists profiles and
//! settings through the store, and republishes the current profile so
//! observers reflect the saved state.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::events::{Event, EventBus};
use crate::profile::ProfileRegistry;
use crate::store::ProfileStore;

/// How often the poll task checks for quiescence.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How long edits must be quiet before a flush runs.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
struct DirtyState {
    dirty: bool,
    last_change: Option<Instant>,
}

/// Shared dirty marker with the timestamp of the latest change.
#[derive(Debug, Default)]
pub struct DirtyFlag {
    inner: Mutex<DirtyState>,
}

impl DirtyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change. Repeated marks just move the timestamp forward.
    pub fn mark(&self) {
        let mut state = lock(&self.inner);
        state.dirty = true;
        state.last_change = Some(Instant::now());
    }

    pub fn is_dirty(&self) -> bool {
        lock(&self.inner).dirty
    }

    /// Dirty, and no new mark for at least `window`.
    pub fn flush_due(&self, window: Duration) -> bool {
        let state = lock(&self.inner);
        state.dirty
            && state
                .last_change
                .is_some_and(|at| at.elapsed() >= window)
    }

    pub fn clear(&self) {
        lock(&self.inner).dirty = false;
    }
}

/// Debounced persistence for the profile registry.
pub struct AutoSaveScheduler {
    registry: Arc<Mutex<ProfileRegistry>>,
    store: Arc<dyn ProfileStore>,
    bus: Arc<EventBus>,
    dirty: Arc<DirtyFlag>,
    /// Serializes flushes; a mark arriving during a flush survives it.
    flush_lock: Mutex<()>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl AutoSaveScheduler {
    pub fn new(
        registry: Arc<Mutex<ProfileRegistry>>,
        store: Arc<dyn ProfileStore>,
        bus: Arc<EventBus>,
        dirty: Arc<DirtyFlag>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            store,
            bus,
            dirty,
            flush_lock: Mutex::new(()),
            poll_task: Mutex::new(None),
        })
    }

    /// Start the background poll task. Must be called within a tokio
    /// runtime; calling it again replaces the previous task.
    pub fn start(self: &Arc<Self>) {
        let scheduler = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if scheduler.dirty.flush_due(DEBOUNCE_WINDOW) {
                    if let Err(e) = scheduler.flush() {
                        // Leave it for the next poll round.
                        warn!(error = %e, "scheduled save failed, will retry");
                    }
                }
            }
        });
        if let Some(previous) = lock(&self.poll_task).replace(task) {
            previous.abort();
        }
    }

    /// Flush immediately, regardless of debounce timing or dirty state.
    /// Unlike scheduled flushes, failures propagate to the caller.
    pub fn force_save(&self) -> Result<(), StoreError> {
        self.flush()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty.is_dirty()
    }

    /// Final flush (when dirty) and poll task teardown.
    pub fn shutdown(&self) {
        if let Some(task) = lock(&self.poll_task).take() {
            task.abort();
        }
        if self.dirty.is_dirty() {
            debug!("flushing unsaved changes at shutdown");
            if let Err(e) = self.flush() {
                warn!(error = %e, "final save at shutdown failed");
            }
        }
    }

    /// Commit pending edits and persist. At most one flush runs at a time.
    fn flush(&self) -> Result<(), StoreError> {
        let _guard = lock(&self.flush_lock);

        // Clear before saving: a mark that lands mid-flush stays set and
        // triggers the next round.
        self.dirty.clear();

        let (profiles, settings, current) = {
            let mut registry = lock(&self.registry);
            registry.commit_pending();
            (
                registry.profiles().to_vec(),
                registry.settings().clone(),
                registry.current_profile().clone(),
            )
        };

        let result = self
            .store
            .save_profiles(&profiles)
            .and_then(|()| self.store.save_settings(&settings));
        if let Err(e) = result {
            self.dirty.mark();
            return Err(e);
        }

        debug!(profiles = profiles.len(), "settings saved");
        self.bus.publish(Event::ProfileChanged {
            old: None,
            profile: current,
            at: Utc::now(),
        });
        Ok(())
    }
}

// A poisoned lock still holds consistent data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
