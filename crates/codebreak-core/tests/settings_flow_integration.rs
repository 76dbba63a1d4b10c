//! End-to-end settings flow: edits land on the pending draft, survive a
//! flush, and come back from disk on the next load.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use codebreak_core::{
    AutoSaveScheduler, DirtyFlag, Event, EventBus, EventKind, JsonProfileStore, ProfileRegistry,
    ProfileStore, TimerController,
};

struct Fixture {
    _dir: TempDir,
    store: Arc<dyn ProfileStore>,
    bus: Arc<EventBus>,
    dirty: Arc<DirtyFlag>,
    registry: Arc<Mutex<ProfileRegistry>>,
    scheduler: Arc<AutoSaveScheduler>,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn ProfileStore> = Arc::new(JsonProfileStore::at(dir.path()));
        let bus = Arc::new(EventBus::new());
        let dirty = Arc::new(DirtyFlag::new());
        let registry = Arc::new(Mutex::new(ProfileRegistry::load(
            store.as_ref(),
            Arc::clone(&bus),
            Arc::clone(&dirty),
        )));
        let scheduler = AutoSaveScheduler::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&dirty),
        );
        Self {
            _dir: dir,
            store,
            bus,
            dirty,
            registry,
            scheduler,
        }
    }

    fn reload_registry(&self) -> ProfileRegistry {
        ProfileRegistry::load(
            self.store.as_ref(),
            Arc::clone(&self.bus),
            Arc::clone(&self.dirty),
        )
    }
}

#[test]
fn edit_then_force_save_persists_and_clears_dirty() {
    let fx = Fixture::new();

    fx.registry
        .lock()
        .unwrap()
        .update_field("workMinutes", 50u32);
    assert!(fx.scheduler.has_unsaved_changes());

    fx.scheduler.force_save().unwrap();
    assert!(!fx.scheduler.has_unsaved_changes());

    let reloaded = fx.reload_registry();
    assert_eq!(reloaded.current_profile().work_minutes, 50);
}

#[test]
fn profile_switch_saves_edits_into_the_previous_profile() {
    let fx = Fixture::new();

    {
        let mut registry = fx.registry.lock().unwrap();
        registry.update_field("breakMinutes", 20u32);
        assert!(registry.set_current_profile("Short Focus"));
    }
    fx.scheduler.force_save().unwrap();

    let reloaded = fx.reload_registry();
    assert_eq!(reloaded.current_profile().name, "Short Focus");
    assert_eq!(reloaded.find("Pomodoro").unwrap().break_minutes, 20);
}

#[test]
fn selection_survives_restart() {
    let fx = Fixture::new();

    assert!(fx
        .registry
        .lock()
        .unwrap()
        .set_current_profile("Long Work"));
    fx.scheduler.force_save().unwrap();

    let reloaded = fx.reload_registry();
    assert_eq!(reloaded.current_profile().name, "Long Work");
}

#[test]
fn deletions_persist_and_never_empty_the_list() {
    let fx = Fixture::new();

    {
        let mut registry = fx.registry.lock().unwrap();
        registry.delete_profile("Long Work").unwrap();
        registry.delete_profile("Short Focus").unwrap();
        assert!(registry.delete_profile("Pomodoro").is_err());
    }
    fx.scheduler.force_save().unwrap();

    let reloaded = fx.reload_registry();
    assert_eq!(reloaded.profiles().len(), 1);
    assert_eq!(reloaded.current_profile().name, "Pomodoro");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn profile_switch_resyncs_the_timer() {
    let fx = Fixture::new();
    let controller = Arc::new(TimerController::new(Arc::clone(&fx.bus)));

    // The application glue: profile changes flow into the engine as value
    // snapshots via the bus, never as shared references.
    let glue = Arc::clone(&controller);
    fx.bus.subscribe(EventKind::ProfileChanged, move |event| {
        if let Event::ProfileChanged { profile, .. } = event {
            glue.apply_profile(profile);
        }
    });

    assert_eq!(controller.remaining_seconds(), 25 * 60);
    assert!(fx
        .registry
        .lock()
        .unwrap()
        .set_current_profile("Long Work"));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.work_minutes, 60);
    assert_eq!(snapshot.break_minutes, 10);
    assert!(!snapshot.pomodoro_mode);
    assert_eq!(snapshot.remaining_seconds, 60 * 60);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn scheduled_flush_fires_once_per_edit_burst() {
    let fx = Fixture::new();
    let flushes = Arc::new(AtomicUsize::new(0));
    let f = Arc::clone(&flushes);
    fx.bus.subscribe(EventKind::ProfileChanged, move |_| {
        f.fetch_add(1, Ordering::SeqCst);
    });

    fx.scheduler.start();
    for minutes in [30u32, 35, 40] {
        fx.registry
            .lock()
            .unwrap()
            .update_field("workMinutes", minutes);
    }

    // The debounce window is measured against the wall clock, so walk real
    // time forward while virtual time drives the poll loop.
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while flushes.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
        tokio::time::sleep(codebreak_core::POLL_INTERVAL).await;
        std::thread::sleep(std::time::Duration::from_millis(20));
    }

    assert_eq!(flushes.load(Ordering::SeqCst), 1);
    assert!(!fx.scheduler.has_unsaved_changes());

    let reloaded = fx.reload_registry();
    assert_eq!(reloaded.current_profile().work_minutes, 40);
    fx.scheduler.shutdown();
}
