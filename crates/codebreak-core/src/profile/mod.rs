//! User profiles and notification types.
//!
//! A profile bundles the timer durations and notification preferences a user
//! can switch between. Profiles are identified by display name; uniqueness is
//! enforced by [`ProfileRegistry`](registry::ProfileRegistry), not by the
//! type itself.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

mod registry;

pub use registry::{FieldValue, ImportReport, ProfileRegistry};

/// Minimum work phase length in minutes.
pub const MIN_WORK_MINUTES: u32 = 1;
/// Maximum work phase length in minutes (3 hours).
pub const MAX_WORK_MINUTES: u32 = 180;
/// Minimum break phase length in minutes.
pub const MIN_BREAK_MINUTES: u32 = 1;
/// Maximum break phase length in minutes (1 hour).
pub const MAX_BREAK_MINUTES: u32 = 60;
/// Minimum snooze delay in minutes.
pub const MIN_SNOOZE_MINUTES: u32 = 1;
/// Maximum snooze delay in minutes.
pub const MAX_SNOOZE_MINUTES: u32 = 30;
/// Maximum profile name length in characters.
pub const MAX_PROFILE_NAME_LEN: usize = 50;

/// Built-in profile names that the safe deletion path refuses to remove.
pub const PROTECTED_PROFILE_NAMES: [&str; 3] = ["Pomodoro", "Long Work", "Short Focus"];

/// The kinds of break reminder a completed phase can raise.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Rest,
    Stretch,
    Water,
    EyeRest,
}

impl NotificationType {
    /// All variants in a stable order.
    pub const ALL: [NotificationType; 4] = [
        NotificationType::Rest,
        NotificationType::Stretch,
        NotificationType::Water,
        NotificationType::EyeRest,
    ];

    pub fn label(self) -> &'static str {
        match self {
            NotificationType::Rest => "Rest",
            NotificationType::Stretch => "Stretch",
            NotificationType::Water => "Drink Water",
            NotificationType::EyeRest => "Rest Your Eyes",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            NotificationType::Rest => "Take a short break!",
            NotificationType::Stretch => "Get up and move around!",
            NotificationType::Water => "Have a glass of water!",
            NotificationType::EyeRest => "Look away from the screen for a while!",
        }
    }
}

/// A named bundle of timer and notification settings.
///
/// Serialized with the application's historical JSON schema: camelCase field
/// names and the enabled notification types as a flat list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "profileName")]
    pub name: String,
    pub work_minutes: u32,
    pub break_minutes: u32,
    pub pomodoro_mode: bool,
    pub sound_enabled: bool,
    pub popup_enabled: bool,
    pub flash_enabled: bool,
    pub snooze_minutes: u32,
    pub auto_start: bool,
    pub minimize_to_tray: bool,
    #[serde(rename = "enabledNotifications", default)]
    pub enabled_notifications: BTreeSet<NotificationType>,
}

impl Profile {
    /// Create a profile with default settings under the given name.
    ///
    /// Only the Rest reminder starts out enabled.
    pub fn new(name: impl Into<String>) -> Self {
        let mut enabled = BTreeSet::new();
        enabled.insert(NotificationType::Rest);
        Self {
            name: name.into(),
            work_minutes: 25,
            break_minutes: 5,
            pomodoro_mode: true,
            sound_enabled: true,
            popup_enabled: true,
            flash_enabled: true,
            snooze_minutes: 5,
            auto_start: false,
            minimize_to_tray: false,
            enabled_notifications: enabled,
        }
    }

    // ── Presets ──────────────────────────────────────────────────────

    /// Classic 25/5 pomodoro preset.
    pub fn pomodoro() -> Self {
        Self::new("Pomodoro")
    }

    /// Long uninterrupted work stretches, 60/10, no phase alternation.
    pub fn long_work() -> Self {
        Self {
            work_minutes: 60,
            break_minutes: 10,
            pomodoro_mode: false,
            ..Self::new("Long Work")
        }
    }

    /// Short bursts of focus, 15/3.
    pub fn short_focus() -> Self {
        Self {
            work_minutes: 15,
            break_minutes: 3,
            ..Self::new("Short Focus")
        }
    }

    /// The profiles seeded when storage is absent or unreadable.
    pub fn builtin_presets() -> Vec<Profile> {
        vec![Self::pomodoro(), Self::long_work(), Self::short_focus()]
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Whether every field is within its allowed range and the name is usable.
    pub fn is_valid(&self) -> bool {
        (MIN_WORK_MINUTES..=MAX_WORK_MINUTES).contains(&self.work_minutes)
            && (MIN_BREAK_MINUTES..=MAX_BREAK_MINUTES).contains(&self.break_minutes)
            && (MIN_SNOOZE_MINUTES..=MAX_SNOOZE_MINUTES).contains(&self.snooze_minutes)
            && !self.name.trim().is_empty()
            && self.name.chars().count() <= MAX_PROFILE_NAME_LEN
    }

    pub fn is_notification_enabled(&self, kind: NotificationType) -> bool {
        self.enabled_notifications.contains(&kind)
    }

    pub fn set_notification_enabled(&mut self, kind: NotificationType, enabled: bool) {
        if enabled {
            self.enabled_notifications.insert(kind);
        } else {
            self.enabled_notifications.remove(&kind);
        }
    }

    /// Copy every non-identity field from `other`.
    pub fn copy_from(&mut self, other: &Profile) {
        self.work_minutes = other.work_minutes;
        self.break_minutes = other.break_minutes;
        self.pomodoro_mode = other.pomodoro_mode;
        self.sound_enabled = other.sound_enabled;
        self.popup_enabled = other.popup_enabled;
        self.flash_enabled = other.flash_enabled;
        self.snooze_minutes = other.snooze_minutes;
        self.auto_start = other.auto_start;
        self.minimize_to_tray = other.minimize_to_tray;
        self.enabled_notifications = other.enabled_notifications.clone();
    }

    /// Whether every non-identity field equals `other`'s.
    pub fn fields_eq(&self, other: &Profile) -> bool {
        self.work_minutes == other.work_minutes
            && self.break_minutes == other.break_minutes
            && self.pomodoro_mode == other.pomodoro_mode
            && self.sound_enabled == other.sound_enabled
            && self.popup_enabled == other.popup_enabled
            && self.flash_enabled == other.flash_enabled
            && self.snooze_minutes == other.snooze_minutes
            && self.auto_start == other.auto_start
            && self.minimize_to_tray == other.minimize_to_tray
            && self.enabled_notifications == other.enabled_notifications
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (work: {}m, break: {}m)",
            self.name, self.work_minutes, self.break_minutes
        )
    }
}
