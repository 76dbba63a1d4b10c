//! In-memory profile registry.
//!
//! The registry is the sole owner and mutator of the profile list, the
//! current-profile selection, and the pending edit draft. Everything else
//! sees value snapshots through events. In-flight edits land on the pending
//! draft only; [`commit_pending`](ProfileRegistry::commit_pending) folds them
//! into the current profile and runs before every save and every switch.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::{
    NotificationType, Profile, MAX_BREAK_MINUTES, MAX_SNOOZE_MINUTES, MAX_WORK_MINUTES,
    MIN_BREAK_MINUTES, MIN_SNOOZE_MINUTES, MIN_WORK_MINUTES, PROTECTED_PROFILE_NAMES,
};
use crate::autosave::DirtyFlag;
use crate::error::ValidationError;
use crate::events::{Event, EventBus};
use crate::store::{profile_field_issues, AppSettings, ProfileStore};

/// Typed value for [`ProfileRegistry::update_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Int(u32),
    Bool(bool),
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

/// Outcome of an import operation, reported as a value rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub success: bool,
    pub message: String,
    pub added: usize,
    pub skipped: usize,
}

impl ImportReport {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            added: 0,
            skipped: 0,
        }
    }
}

pub struct ProfileRegistry {
    profiles: Vec<Profile>,
    /// Index of the current profile; always a member of `profiles`.
    current: usize,
    /// Draft copy of the current profile carrying uncommitted edits.
    pending: Profile,
    settings: AppSettings,
    bus: Arc<EventBus>,
    dirty: Arc<DirtyFlag>,
}

impl ProfileRegistry {
    /// Load profiles and settings from the store.
    ///
    /// The previously selected profile is re-selected when it still exists;
    /// otherwise the first profile wins and the selection is rewritten.
    pub fn load(store: &dyn ProfileStore, bus: Arc<EventBus>, dirty: Arc<DirtyFlag>) -> Self {
        let profiles = store.load_profiles();
        let settings = store.load_settings();
        Self::with_profiles(profiles, settings, bus, dirty)
    }

    /// Build a registry from an explicit profile list. Empty lists are
    /// replaced with the built-in presets.
    pub fn with_profiles(
        mut profiles: Vec<Profile>,
        mut settings: AppSettings,
        bus: Arc<EventBus>,
        dirty: Arc<DirtyFlag>,
    ) -> Self {
        if profiles.is_empty() {
            warn!("registry started with no profiles, seeding built-in presets");
            profiles = Profile::builtin_presets();
        }

        let current = profiles
            .iter()
            .position(|p| p.name == settings.selected_profile)
            .unwrap_or_else(|| {
                info!(
                    fallback = %profiles[0].name,
                    "selected profile not found, falling back to the first profile"
                );
                0
            });
        settings.selected_profile = profiles[current].name.clone();
        let pending = profiles[current].clone();

        Self {
            profiles,
            current,
            pending,
            settings,
            bus,
            dirty,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn current_profile(&self) -> &Profile {
        &self.profiles[self.current]
    }

    /// The live view including uncommitted edits.
    pub fn current_with_pending(&self) -> &Profile {
        &self.pending
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut AppSettings {
        self.dirty.mark();
        &mut self.settings
    }

    pub fn find(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Case-insensitive lookup, used for startup `--profile` matching.
    pub fn find_ignore_case(&self, name: &str) -> Option<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    // ── Selection and editing ────────────────────────────────────────

    /// Switch the current profile. Returns false (leaving everything
    /// untouched) when `name` is not a member of the list.
    pub fn set_current_profile(&mut self, name: &str) -> bool {
        let Some(index) = self.profiles.iter().position(|p| p.name == name) else {
            warn!(profile = name, "cannot select unknown profile");
            return false;
        };

        // Outstanding edits belong to the profile they were made against.
        self.commit_pending();

        let old = self.current_profile().clone();
        self.current = index;
        self.settings.selected_profile = self.profiles[index].name.clone();
        self.pending = self.profiles[index].clone();
        self.dirty.mark();

        let new = self.profiles[index].clone();
        debug!(from = %old.name, to = %new.name, "profile switched");
        self.bus.publish(Event::ProfileChanged {
            old: Some(old),
            profile: new,
            at: Utc::now(),
        });
        true
    }

    /// Apply a single validated field edit to the pending draft. Unknown
    /// fields and out-of-range values are rejected with a diagnostic.
    /// Re-applying an unchanged value neither mutates nor re-marks dirty.
    pub fn update_field(&mut self, field: &str, value: impl Into<FieldValue>) -> bool {
        let value = value.into();
        let applied = match (field, value) {
            ("workMinutes", FieldValue::Int(v)) => {
                in_range(field, v, MIN_WORK_MINUTES, MAX_WORK_MINUTES)
                    && set_if_changed(&mut self.pending.work_minutes, v)
            }
            ("breakMinutes", FieldValue::Int(v)) => {
                in_range(field, v, MIN_BREAK_MINUTES, MAX_BREAK_MINUTES)
                    && set_if_changed(&mut self.pending.break_minutes, v)
            }
            ("snoozeMinutes", FieldValue::Int(v)) => {
                in_range(field, v, MIN_SNOOZE_MINUTES, MAX_SNOOZE_MINUTES)
                    && set_if_changed(&mut self.pending.snooze_minutes, v)
            }
            ("pomodoroMode", FieldValue::Bool(v)) => {
                set_if_changed(&mut self.pending.pomodoro_mode, v)
            }
            ("soundEnabled", FieldValue::Bool(v)) => {
                set_if_changed(&mut self.pending.sound_enabled, v)
            }
            ("popupEnabled", FieldValue::Bool(v)) => {
                set_if_changed(&mut self.pending.popup_enabled, v)
            }
            ("flashEnabled", FieldValue::Bool(v)) => {
                set_if_changed(&mut self.pending.flash_enabled, v)
            }
            ("autoStart", FieldValue::Bool(v)) => set_if_changed(&mut self.pending.auto_start, v),
            ("minimizeToTray", FieldValue::Bool(v)) => {
                set_if_changed(&mut self.pending.minimize_to_tray, v)
            }
            _ => {
                warn!(field, ?value, "ignoring unknown or mistyped profile field");
                return false;
            }
        };

        if applied {
            self.dirty.mark();
        }
        applied || self.field_matches(field, value)
    }

    /// Toggle one reminder type on the pending draft.
    pub fn update_notification(&mut self, kind: NotificationType, enabled: bool) {
        if self.pending.is_notification_enabled(kind) != enabled {
            self.pending.set_notification_enabled(kind, enabled);
            self.dirty.mark();
        }
    }

    /// Fold the pending draft into the current profile. Runs before every
    /// save and every profile switch.
    pub fn commit_pending(&mut self) {
        let pending = self.pending.clone();
        self.profiles[self.current].copy_from(&pending);
    }

    // ── List management ──────────────────────────────────────────────

    /// Add a profile inheriting the current pending values. New profiles
    /// always get the Rest reminder enabled and never start minimized to
    /// the tray.
    pub fn add_profile(&mut self, name: &str) -> Result<Profile, ValidationError> {
        let name = Self::acceptable_name(name)?;
        if self.find(&name).is_some() {
            return Err(ValidationError::DuplicateName(name));
        }

        let mut profile = Profile::new(name);
        profile.copy_from(&self.pending);
        Self::apply_new_profile_policy(&mut profile);

        info!(profile = %profile.name, "profile added");
        self.profiles.push(profile.clone());
        self.dirty.mark();
        Ok(profile)
    }

    /// One-shot profile creation from bare durations, with derived settings:
    /// pomodoro alternation whenever a break exists, no screen flash, and a
    /// snooze of half the break (at least 3 minutes). A missing name derives
    /// one from the work duration.
    pub fn create_quick_profile(
        &mut self,
        work_minutes: u32,
        break_minutes: u32,
        name: Option<&str>,
    ) -> Result<Profile, ValidationError> {
        if !(MIN_WORK_MINUTES..=MAX_WORK_MINUTES).contains(&work_minutes) {
            return Err(ValidationError::InvalidValue {
                field: "workMinutes".into(),
                message: format!("{work_minutes} outside [{MIN_WORK_MINUTES}, {MAX_WORK_MINUTES}]"),
            });
        }
        if !(MIN_BREAK_MINUTES..=MAX_BREAK_MINUTES).contains(&break_minutes) {
            return Err(ValidationError::InvalidValue {
                field: "breakMinutes".into(),
                message: format!(
                    "{break_minutes} outside [{MIN_BREAK_MINUTES}, {MAX_BREAK_MINUTES}]"
                ),
            });
        }

        let name = match name {
            Some(n) if !n.trim().is_empty() => Self::acceptable_name(n)?,
            _ => self.unique_name(&format!("{work_minutes}m work")),
        };
        if self.find(&name).is_some() {
            return Err(ValidationError::DuplicateName(name));
        }

        let mut profile = Profile::new(name);
        profile.work_minutes = work_minutes;
        profile.break_minutes = break_minutes;
        profile.pomodoro_mode = break_minutes > 0;
        profile.flash_enabled = false;
        profile.snooze_minutes = (break_minutes / 2).clamp(3, MAX_SNOOZE_MINUTES);
        profile.enabled_notifications.clear();
        Self::apply_new_profile_policy(&mut profile);

        info!(profile = %profile.name, "quick profile created");
        self.profiles.push(profile.clone());
        self.dirty.mark();
        Ok(profile)
    }

    /// Remove a profile. The last remaining profile cannot be deleted;
    /// deleting the current profile falls back to the first remaining one.
    pub fn delete_profile(&mut self, name: &str) -> Result<(), ValidationError> {
        if self.profiles.len() <= 1 {
            return Err(ValidationError::LastProfile);
        }
        let Some(index) = self.profiles.iter().position(|p| p.name == name) else {
            return Err(ValidationError::UnknownProfile(name.to_string()));
        };

        let was_current = index == self.current;
        let current_name = self.current_profile().name.clone();
        self.profiles.remove(index);

        if was_current {
            let fallback = self.profiles[0].name.clone();
            self.current = 0;
            self.pending = self.profiles[0].clone();
            info!(deleted = name, fallback = %fallback, "current profile deleted");
            self.set_current_profile(&fallback);
        } else {
            // Keep the index tracking the same profile after the removal.
            self.current = self
                .profiles
                .iter()
                .position(|p| p.name == current_name)
                .unwrap_or(0);
        }

        self.dirty.mark();
        Ok(())
    }

    /// Like [`delete_profile`](Self::delete_profile) but refuses to remove
    /// the built-in presets.
    pub fn safe_delete_profile(&mut self, name: &str) -> Result<(), ValidationError> {
        if PROTECTED_PROFILE_NAMES.contains(&name) {
            return Err(ValidationError::ProtectedProfile(name.to_string()));
        }
        self.delete_profile(name)
    }

    /// Deep-copy `src` under `new_name`, applying the same policy overrides
    /// as [`add_profile`](Self::add_profile). A blank `new_name` derives one
    /// from the source.
    pub fn duplicate_profile(
        &mut self,
        src: &str,
        new_name: &str,
    ) -> Result<Profile, ValidationError> {
        let Some(source) = self.find(src).cloned() else {
            return Err(ValidationError::UnknownProfile(src.to_string()));
        };

        let name = if new_name.trim().is_empty() {
            self.unique_name(&format!("{} copy", source.name))
        } else {
            Self::acceptable_name(new_name)?
        };
        if self.find(&name).is_some() {
            return Err(ValidationError::DuplicateName(name));
        }

        let mut duplicate = Profile::new(name);
        duplicate.copy_from(&source);
        Self::apply_new_profile_policy(&mut duplicate);

        info!(src, dst = %duplicate.name, "profile duplicated");
        self.profiles.push(duplicate.clone());
        self.dirty.mark();
        Ok(duplicate)
    }

    // ── Import / export orchestration ────────────────────────────────

    /// Append profiles from an external file. Name collisions against the
    /// existing list are renamed; entries still colliding afterwards (a file
    /// repeating one name) are skipped.
    pub fn import_profiles(&mut self, store: &dyn ProfileStore, path: &Path) -> ImportReport {
        let imported = match store.import_from_file(path) {
            Ok(profiles) => profiles,
            Err(e) => return ImportReport::failure(format!("import failed: {e}")),
        };
        if imported.is_empty() {
            return ImportReport::failure("no profiles found in file");
        }
        let issues = profile_field_issues(&imported);
        if !issues.is_empty() {
            return ImportReport::failure(format!(
                "imported profiles failed validation:\n{}",
                issues.join("\n")
            ));
        }

        // Rename against the pre-import list first, then add one by one so
        // duplicates within the file itself surface as skips.
        let renamed: Vec<Profile> = imported
            .into_iter()
            .map(|mut p| {
                let unique = self.unique_name(&p.name);
                if unique != p.name {
                    debug!(from = %p.name, to = %unique, "renaming imported profile");
                    p.name = unique;
                }
                p
            })
            .collect();

        let mut added = 0;
        let mut skipped = 0;
        for mut profile in renamed {
            if self.find(&profile.name).is_some() {
                skipped += 1;
                continue;
            }
            profile.set_notification_enabled(NotificationType::Rest, true);
            self.profiles.push(profile);
            added += 1;
        }

        if added == 0 {
            return ImportReport {
                success: false,
                message: "no new profiles were added".into(),
                added,
                skipped,
            };
        }

        self.dirty.mark();
        info!(added, skipped, "profiles imported");
        ImportReport {
            success: true,
            message: format!("imported {added} profile(s)"),
            added,
            skipped,
        }
    }

    /// Replace the whole list with the file's contents and select the first
    /// imported profile. The existing list is untouched unless the file
    /// loads and validates cleanly.
    pub fn replace_all_profiles(&mut self, store: &dyn ProfileStore, path: &Path) -> ImportReport {
        let imported = match store.import_from_file(path) {
            Ok(profiles) => profiles,
            Err(e) => return ImportReport::failure(format!("import failed: {e}")),
        };
        if imported.is_empty() {
            return ImportReport::failure("no profiles found in file");
        }
        let issues = profile_field_issues(&imported);
        if !issues.is_empty() {
            return ImportReport::failure(format!(
                "imported profiles failed validation:\n{}",
                issues.join("\n")
            ));
        }

        let count = imported.len();
        self.profiles = imported;
        for profile in &mut self.profiles {
            profile.set_notification_enabled(NotificationType::Rest, true);
        }
        self.current = 0;
        self.pending = self.profiles[0].clone();
        let first = self.profiles[0].name.clone();
        self.settings.selected_profile = first.clone();
        self.dirty.mark();

        self.bus.publish(Event::ProfileChanged {
            old: None,
            profile: self.profiles[0].clone(),
            at: Utc::now(),
        });

        info!(count, selected = %first, "profile list replaced");
        ImportReport {
            success: true,
            message: format!("replaced profile list with {count} profile(s)"),
            added: count,
            skipped: 0,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Derive a name not present in the list: `base`, then `base (1)`,
    /// `base (2)`, ...
    fn unique_name(&self, base: &str) -> String {
        if self.find(base).is_none() {
            return base.to_string();
        }
        let mut counter = 1;
        loop {
            let candidate = format!("{base} ({counter})");
            if self.find(&candidate).is_none() {
                return candidate;
            }
            counter += 1;
        }
    }

    fn acceptable_name(name: &str) -> Result<String, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankName);
        }
        if name.chars().count() > super::MAX_PROFILE_NAME_LEN {
            return Err(ValidationError::NameTooLong(name.to_string()));
        }
        Ok(name.to_string())
    }

    fn apply_new_profile_policy(profile: &mut Profile) {
        profile.set_notification_enabled(NotificationType::Rest, true);
        profile.minimize_to_tray = false;
    }

    fn field_matches(&self, field: &str, value: FieldValue) -> bool {
        match (field, value) {
            ("workMinutes", FieldValue::Int(v)) => self.pending.work_minutes == v,
            ("breakMinutes", FieldValue::Int(v)) => self.pending.break_minutes == v,
            ("snoozeMinutes", FieldValue::Int(v)) => self.pending.snooze_minutes == v,
            ("pomodoroMode", FieldValue::Bool(v)) => self.pending.pomodoro_mode == v,
            ("soundEnabled", FieldValue::Bool(v)) => self.pending.sound_enabled == v,
            ("popupEnabled", FieldValue::Bool(v)) => self.pending.popup_enabled == v,
            ("flashEnabled", FieldValue::Bool(v)) => self.pending.flash_enabled == v,
            ("autoStart", FieldValue::Bool(v)) => self.pending.auto_start == v,
            ("minimizeToTray", FieldValue::Bool(v)) => self.pending.minimize_to_tray == v,
            _ => false,
        }
    }
}

fn in_range(field: &str, value: u32, min: u32, max: u32) -> bool {
    if (min..=max).contains(&value) {
        true
    } else {
        warn!(field, value, min, max, "rejecting out-of-range value");
        false
    }
}

fn set_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
