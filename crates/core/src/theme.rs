//! Light/dark theme preference.
//!
//! [`ThemeContext`] is built once at launch from a [`SettingsStore`], handed to whatever needs
//! it, and flushed on exit. The preference is stored under [`THEME_STORAGE_KEY`] as
//! `"light"` or `"dark"`.

use crate::constants::THEME_STORAGE_KEY;
use crate::{PortalError, PortalResult};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, RwLock};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThemePreference {
    #[default]
    Light,
    Dark,
}

impl ThemePreference {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ThemePreference::Light => ThemePreference::Dark,
            ThemePreference::Dark => ThemePreference::Light,
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemePreference {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(ThemePreference::Light),
            "dark" => Ok(ThemePreference::Dark),
            other => Err(PortalError::InvalidInput(format!(
                "unknown theme '{other}' (expected light or dark)"
            ))),
        }
    }
}

/// Small string key-value store for local settings.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> PortalResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PortalResult<()>;
}

/// Settings kept in memory only.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySettings {
    fn values(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> PortalResult<Option<String>> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortalResult<()> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings persisted as a flat JSON object in a single file.
///
/// A missing file reads as empty. Every `set` rewrites the whole file.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    // Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> PortalResult<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(PortalError::Deserialization),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(PortalError::SettingsRead(e)),
        }
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> PortalResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> PortalResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(PortalError::SettingsWrite)?;
        }
        let json = serde_json::to_string_pretty(&values).map_err(PortalError::Serialization)?;
        std::fs::write(&self.path, json).map_err(PortalError::SettingsWrite)
    }
}

/// Process-wide theme flag, persisted through a [`SettingsStore`].
pub struct ThemeContext {
    store: Arc<dyn SettingsStore>,
    preference: RwLock<ThemePreference>,
}

impl fmt::Debug for ThemeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeContext")
            .field("preference", &self.preference())
            .finish_non_exhaustive()
    }
}

impl ThemeContext {
    /// Loads the stored preference.
    ///
    /// Never fails: an unreadable store or an unknown stored value falls back to light.
    pub fn load(store: Arc<dyn SettingsStore>) -> Self {
        let preference = match store.get(THEME_STORAGE_KEY) {
            Ok(None) => ThemePreference::default(),
            Ok(Some(value)) => value.parse().unwrap_or_else(|_| {
                tracing::warn!("ignoring stored theme value '{}'", value);
                ThemePreference::default()
            }),
            Err(e) => {
                tracing::warn!("could not load theme preference: {:?}", e);
                ThemePreference::default()
            }
        };

        Self {
            store,
            preference: RwLock::new(preference),
        }
    }

    pub fn preference(&self) -> ThemePreference {
        *self
            .preference
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_dark(&self) -> bool {
        self.preference() == ThemePreference::Dark
    }

    /// Flips the flag and persists it.
    ///
    /// The in-memory flag changes even if persisting fails; the error is returned so the
    /// caller can report it.
    pub fn toggle(&self) -> PortalResult<ThemePreference> {
        let next = {
            let mut guard = self
                .preference
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = guard.toggled();
            *guard
        };
        tracing::info!("theme toggled to {}", next);
        self.persist(next)?;
        Ok(next)
    }

    /// Sets an explicit preference and persists it.
    pub fn set(&self, preference: ThemePreference) -> PortalResult<()> {
        *self
            .preference
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = preference;
        self.persist(preference)
    }

    /// Writes the current flag one last time.
    pub fn shutdown(&self) -> PortalResult<()> {
        self.persist(self.preference())
    }

    fn persist(&self, preference: ThemePreference) -> PortalResult<()> {
        self.store
            .set(THEME_STORAGE_KEY, preference.as_str())
            .inspect_err(|e| tracing::error!("failed to persist theme: {:?}", e))
    }
}
