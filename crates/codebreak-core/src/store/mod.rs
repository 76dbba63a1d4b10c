//! Profile and settings persistence.
//!
//! The core depends only on the [`ProfileStore`] trait; the bundled
//! [`JsonProfileStore`] keeps profiles and application settings as JSON files
//! in the data directory. Export supports JSON and a TOML text format, and
//! import auto-detects which of the two it is reading.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, StoreError};
use crate::profile::{
    Profile, MAX_BREAK_MINUTES, MAX_PROFILE_NAME_LEN, MAX_SNOOZE_MINUTES, MAX_WORK_MINUTES,
    MIN_BREAK_MINUTES, MIN_SNOOZE_MINUTES, MIN_WORK_MINUTES,
};

mod json;

pub use json::JsonProfileStore;

/// Application-level settings persisted beside the profile list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default)]
    pub selected_profile: String,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default = "default_window_x")]
    pub window_x: i32,
    #[serde(default = "default_window_y")]
    pub window_y: i32,
    #[serde(default)]
    pub start_minimized: bool,
    #[serde(default)]
    pub disable_tray: bool,
}

fn default_window_width() -> u32 {
    450
}
fn default_window_height() -> u32 {
    350
}
fn default_window_x() -> i32 {
    100
}
fn default_window_y() -> i32 {
    100
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            selected_profile: String::new(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            window_x: default_window_x(),
            window_y: default_window_y(),
            start_minimized: false,
            disable_tray: false,
        }
    }
}

/// On-disk wrapper around the profile list; shared by the JSON store files
/// and both export formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ProfileDocument {
    pub profiles: Vec<Profile>,
}

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Text,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "text" | "toml" => Ok(ExportFormat::Text),
            other => Err(format!("unknown export format '{other}' (expected json or text)")),
        }
    }
}

/// Storage contract the registry and auto-save pipeline depend on.
pub trait ProfileStore: Send + Sync {
    /// Load the persisted profile list, falling back to the built-in presets
    /// when storage is absent or unreadable. Never fails.
    fn load_profiles(&self) -> Vec<Profile>;

    fn save_profiles(&self, profiles: &[Profile]) -> Result<(), StoreError>;

    /// Load application settings, falling back to defaults. Never fails.
    fn load_settings(&self) -> AppSettings;

    fn save_settings(&self, settings: &AppSettings) -> Result<(), StoreError>;

    fn export_to_file(
        &self,
        profiles: &[Profile],
        path: &Path,
        format: ExportFormat,
    ) -> Result<(), StoreError>;

    /// Read a profile list from an external file, auto-detecting the format.
    fn import_from_file(&self, path: &Path) -> Result<Vec<Profile>, ImportError>;

    /// Human-readable issues preventing the given profiles from being used.
    fn validate(&self, profiles: &[Profile]) -> Vec<String> {
        validate_profiles(profiles)
    }
}

/// Check a profile list for out-of-range fields, unusable names, and
/// duplicate names.
pub fn validate_profiles(profiles: &[Profile]) -> Vec<String> {
    let mut issues = profile_field_issues(profiles);

    for (i, profile) in profiles.iter().enumerate() {
        if profiles[..i].iter().any(|p| p.name == profile.name) {
            issues.push(format!("duplicate profile name '{}'", profile.name));
        }
    }

    issues
}

/// Per-profile field checks only; duplicate names are left to the caller.
/// Import renames collisions instead of rejecting them.
pub fn profile_field_issues(profiles: &[Profile]) -> Vec<String> {
    let mut issues = Vec::new();

    for profile in profiles {
        let name = profile.name.trim();
        if name.is_empty() {
            issues.push("a profile has a blank name".to_string());
            continue;
        }
        if profile.name.chars().count() > MAX_PROFILE_NAME_LEN {
            issues.push(format!(
                "profile '{name}': name exceeds {MAX_PROFILE_NAME_LEN} characters"
            ));
        }
        if !(MIN_WORK_MINUTES..=MAX_WORK_MINUTES).contains(&profile.work_minutes) {
            issues.push(format!(
                "profile '{name}': work minutes {} outside [{MIN_WORK_MINUTES}, {MAX_WORK_MINUTES}]",
                profile.work_minutes
            ));
        }
        if !(MIN_BREAK_MINUTES..=MAX_BREAK_MINUTES).contains(&profile.break_minutes) {
            issues.push(format!(
                "profile '{name}': break minutes {} outside [{MIN_BREAK_MINUTES}, {MAX_BREAK_MINUTES}]",
                profile.break_minutes
            ));
        }
        if !(MIN_SNOOZE_MINUTES..=MAX_SNOOZE_MINUTES).contains(&profile.snooze_minutes) {
            issues.push(format!(
                "profile '{name}': snooze minutes {} outside [{MIN_SNOOZE_MINUTES}, {MAX_SNOOZE_MINUTES}]",
                profile.snooze_minutes
            ));
        }
    }

    issues
}

/// Returns the data directory, creating it when missing.
///
/// `CODEBREAK_DATA_DIR` overrides the location entirely (used by tests);
/// otherwise this is `~/.config/codebreak`, or `~/.config/codebreak-dev`
/// when `CODEBREAK_ENV=dev`.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    let dir = match std::env::var_os("CODEBREAK_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("CODEBREAK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base.join("codebreak-dev")
            } else {
                base.join("codebreak")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| StoreError::DataDir(e.to_string()))?;
    Ok(dir)
}
