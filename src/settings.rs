use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

pub use validation::{MIN_DETECTION_INTERVAL_MS, MIN_FOCUS_INTERVAL_SECS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Auto,
    Zh,
    En,
}

/// Stored under the same keys the settings UI writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "enableFocus")]
    pub enabled: bool,
    #[serde(rename = "focusInterval")]
    pub focus_interval_seconds: u64,
    #[serde(rename = "detectionInterval")]
    pub detection_interval_ms: u64,
    #[serde(rename = "debugMode")]
    pub debug_mode: bool,
    pub language: Language,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            focus_interval_seconds: 60,
            detection_interval_ms: 10_000,
            debug_mode: false,
            language: Language::Auto,
        }
    }
}

impl Settings {
    pub fn focus_interval(&self) -> Duration {
        Duration::from_secs(self.focus_interval_seconds)
    }

    pub fn detection_interval(&self) -> Duration {
        Duration::from_millis(self.detection_interval_ms)
    }

    /// Replaces out-of-range numbers (hand-edited files, older versions) with
    /// the defaults.
    fn sanitized(mut self) -> Self {
        let defaults = Settings::default();
        if self.focus_interval_seconds < MIN_FOCUS_INTERVAL_SECS {
            log::warn!(
                "Stored focus interval {}s is below the minimum; using {}s",
                self.focus_interval_seconds,
                defaults.focus_interval_seconds
            );
            self.focus_interval_seconds = defaults.focus_interval_seconds;
        }
        if self.detection_interval_ms < MIN_DETECTION_INTERVAL_MS {
            log::warn!(
                "Stored detection interval {}ms is below the minimum; using {}ms",
                self.detection_interval_ms,
                defaults.detection_interval_ms
            );
            self.detection_interval_ms = defaults.detection_interval_ms;
        }
        self
    }
}

/// Rejections the settings UI turns into a notice.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("focus interval must be a whole number of seconds, at least {min}: {input:?}")]
    InvalidFocusInterval { input: String, min: u64 },
    #[error("detection interval must be a whole number of milliseconds, at least {min}: {input:?}")]
    InvalidDetectionInterval { input: String, min: u64 },
    #[error(transparent)]
    Persist(#[from] anyhow::Error),
}

/// Validation for raw settings input
pub mod validation {
    use super::SettingsError;

    pub const MIN_FOCUS_INTERVAL_SECS: u64 = 1;
    pub const MIN_DETECTION_INTERVAL_MS: u64 = 100;

    fn parse_at_least(raw: &str, min: u64) -> Option<u64> {
        raw.trim().parse::<u64>().ok().filter(|value| *value >= min)
    }

    pub fn parse_focus_interval(raw: &str) -> Result<u64, SettingsError> {
        parse_at_least(raw, MIN_FOCUS_INTERVAL_SECS).ok_or_else(|| {
            SettingsError::InvalidFocusInterval {
                input: raw.to_string(),
                min: MIN_FOCUS_INTERVAL_SECS,
            }
        })
    }

    pub fn parse_detection_interval(raw: &str) -> Result<u64, SettingsError> {
        parse_at_least(raw, MIN_DETECTION_INTERVAL_MS).ok_or_else(|| {
            SettingsError::InvalidDetectionInterval {
                input: raw.to_string(),
                min: MIN_DETECTION_INTERVAL_MS,
            }
        })
    }
}

pub struct SettingsStore {
    /// `None` keeps the settings in memory only
    path: Option<PathBuf>,
    data: RwLock<Settings>,
}

impl SettingsStore {
    /// Loads the file at `path` over the defaults. A missing file or one that
    /// no longer parses yields the defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<Settings>(&contents) {
                Ok(settings) => settings.sanitized(),
                Err(err) => {
                    log::warn!(
                        "Ignoring unreadable settings at {}: {err}",
                        path.display()
                    );
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    pub fn in_memory(settings: Settings) -> Self {
        Self {
            path: None,
            data: RwLock::new(settings.sanitized()),
        }
    }

    pub fn get(&self) -> Settings {
        self.read().clone()
    }

    pub fn enabled(&self) -> bool {
        self.read().enabled
    }

    pub fn focus_interval(&self) -> Duration {
        self.read().focus_interval()
    }

    pub fn detection_interval(&self) -> Duration {
        self.read().detection_interval()
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<Settings> {
        self.update(|settings| settings.enabled = enabled)
    }

    pub fn set_debug_mode(&self, debug_mode: bool) -> Result<Settings> {
        self.update(|settings| settings.debug_mode = debug_mode)
    }

    pub fn set_language(&self, language: Language) -> Result<Settings> {
        self.update(|settings| settings.language = language)
    }

    /// Validates and stores a focus interval typed by the user. On rejection
    /// nothing changes.
    pub fn set_focus_interval(&self, raw: &str) -> Result<Settings, SettingsError> {
        let seconds = validation::parse_focus_interval(raw)?;
        Ok(self.update(|settings| settings.focus_interval_seconds = seconds)?)
    }

    pub fn set_detection_interval(&self, raw: &str) -> Result<Settings, SettingsError> {
        let millis = validation::parse_detection_interval(raw)?;
        Ok(self.update(|settings| settings.detection_interval_ms = millis)?)
    }

    /// Applies `change` to a copy, persists it, and only then publishes it.
    fn update(&self, change: impl FnOnce(&mut Settings)) -> Result<Settings> {
        let mut guard = self.write();
        let mut next = guard.clone();
        change(&mut next);
        self.persist(&next)?;
        *guard = next.clone();
        Ok(next)
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SettingsStore {
    /// Re-reads the file after an outside edit. A missing file means defaults;
    /// one that does not parse is an error and the current settings stay.
    pub fn reload(&self) -> Result<Settings> {
        let Some(path) = &self.path else {
            return Ok(self.get());
        };
        let data = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str::<Settings>(&contents)
                .with_context(|| format!("Failed to parse settings at {}", path.display()))?
                .sanitized()
        } else {
            Settings::default()
        };
        *self.write() = data.clone();
        Ok(data)
    }
}
