//! # Code Break Core Library
//!
//! Core business logic for the Code Break productivity timer: the timer
//! state machine, multi-profile settings with a debounced auto-save
//! pipeline, a typed event bus, and notification routing. The GUI, tray,
//! and platform layers are thin shells over this crate -- they subscribe to
//! the event bus and implement the notification-channel trait, but no core
//! component depends on a UI toolkit.
//!
//! ## Key components
//!
//! - [`TimerEngine`]: pure work/break state machine, driven by
//!   [`TimerController`]'s 1-second tick task
//! - [`ProfileRegistry`]: profile list + current selection + pending edit
//!   draft; sole owner and mutator of profile state
//! - [`AutoSaveScheduler`]: debounced persistence through a [`ProfileStore`]
//! - [`EventBus`]: synchronous typed publish/subscribe
//! - [`NotificationRouter`]: fans completions out to delivery channels

pub mod autosave;
pub mod error;
pub mod events;
pub mod notify;
pub mod profile;
pub mod store;
pub mod timer;

pub use autosave::{AutoSaveScheduler, DirtyFlag, DEBOUNCE_WINDOW, POLL_INTERVAL};
pub use error::{CoreError, ImportError, StoreError, ValidationError};
pub use events::{Event, EventBus, EventKind, Subscription};
pub use notify::{
    ChannelGate, ForegroundProbe, LogChannel, NoProbe, Notification, NotificationChannel,
    NotificationRouter,
};
pub use profile::{FieldValue, ImportReport, NotificationType, Profile, ProfileRegistry};
pub use store::{
    data_dir, validate_profiles, AppSettings, ExportFormat, JsonProfileStore, ProfileStore,
};
pub use timer::{
    Completion, Phase, TimerController, TimerEngine, TimerSnapshot, TimerState, TICK_INTERVAL,
};
