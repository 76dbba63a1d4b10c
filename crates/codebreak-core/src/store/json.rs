//! JSON-file implementation of [`ProfileStore`].
//!
//! Profiles live in `profiles.json`, application settings in
//! `settings.json`. Both keep the application's historical camelCase schema.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{data_dir, AppSettings, ExportFormat, ProfileDocument, ProfileStore};
use crate::error::{ImportError, StoreError};
use crate::profile::Profile;

const PROFILES_FILE: &str = "profiles.json";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    dir: PathBuf,
}

impl JsonProfileStore {
    /// Store rooted at the default data directory.
    pub fn new() -> Result<Self, StoreError> {
        Ok(Self { dir: data_dir()? })
    }

    /// Store rooted at an explicit directory.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn profiles_path(&self) -> PathBuf {
        self.dir.join(PROFILES_FILE)
    }

    fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    fn write(&self, path: &Path, content: &str) -> Result<(), StoreError> {
        std::fs::write(path, content).map_err(|source| StoreError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ProfileStore for JsonProfileStore {
    fn load_profiles(&self) -> Vec<Profile> {
        let path = self.profiles_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => {
                info!(path = %path.display(), "no profile file, seeding built-in presets");
                return Profile::builtin_presets();
            }
        };

        match serde_json::from_str::<ProfileDocument>(&content) {
            Ok(doc) if !doc.profiles.is_empty() => doc.profiles,
            Ok(_) => {
                warn!(path = %path.display(), "profile file is empty, seeding built-in presets");
                Profile::builtin_presets()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable profile file, seeding built-in presets");
                Profile::builtin_presets()
            }
        }
    }

    fn save_profiles(&self, profiles: &[Profile]) -> Result<(), StoreError> {
        let doc = ProfileDocument {
            profiles: profiles.to_vec(),
        };
        let content =
            serde_json::to_string_pretty(&doc).map_err(|e| StoreError::Encode(e.to_string()))?;
        self.write(&self.profiles_path(), &content)
    }

    fn load_settings(&self) -> AppSettings {
        let path = self.settings_path();
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "unreadable settings file, using defaults");
                AppSettings::default()
            }),
            Err(_) => AppSettings::default(),
        }
    }

    fn save_settings(&self, settings: &AppSettings) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        self.write(&self.settings_path(), &content)
    }

    fn export_to_file(
        &self,
        profiles: &[Profile],
        path: &Path,
        format: ExportFormat,
    ) -> Result<(), StoreError> {
        let doc = ProfileDocument {
            profiles: profiles.to_vec(),
        };
        let content = match format {
            ExportFormat::Json => {
                serde_json::to_string_pretty(&doc).map_err(|e| StoreError::Encode(e.to_string()))?
            }
            ExportFormat::Text => {
                toml::to_string_pretty(&doc).map_err(|e| StoreError::Encode(e.to_string()))?
            }
        };
        self.write(path, &content)
    }

    fn import_from_file(&self, path: &Path) -> Result<Vec<Profile>, ImportError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ImportError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;

        // JSON first, then the TOML text format.
        if let Ok(doc) = serde_json::from_str::<ProfileDocument>(&content) {
            return Ok(doc.profiles);
        }
        match toml::from_str::<ProfileDocument>(&content) {
            Ok(doc) => Ok(doc.profiles),
            Err(e) => Err(ImportError::UnrecognizedFormat(e.to_string())),
        }
    }
}
