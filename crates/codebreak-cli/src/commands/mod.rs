pub mod config;
pub mod profile;
pub mod timer;

use std::sync::{Arc, Mutex};

use codebreak_core::{
    AutoSaveScheduler, DirtyFlag, EventBus, JsonProfileStore, ProfileRegistry, ProfileStore,
};

/// Shared wiring for every subcommand: store, bus, registry, scheduler.
pub struct AppContext {
    pub store: Arc<dyn ProfileStore>,
    pub bus: Arc<EventBus>,
    pub registry: Arc<Mutex<ProfileRegistry>>,
    pub scheduler: Arc<AutoSaveScheduler>,
}

impl AppContext {
    pub fn init() -> Result<Self, Box<dyn std::error::Error>> {
        let store: Arc<dyn ProfileStore> = Arc::new(JsonProfileStore::new()?);
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
            dirty,
        );
        Ok(Self {
            store,
            bus,
            registry,
            scheduler,
        })
    }
}
