use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use crate::history::HistoryFormatter;

pub const DATA_DIR_ENV: &str = "SLEEPTRACKER_DATA_DIR";
pub const DEBUG_ENV: &str = "SLEEPTRACKER_DEBUG";

const SETTINGS_FILE: &str = "settings.json";
const DEFAULT_DATABASE_FILE: &str = "sleeptracker.sqlite3";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerSettings {
    /// Relative paths resolve against the data directory.
    pub database_file: PathBuf,
    /// Display offset for history timestamps; `None` uses the local offset.
    pub utc_offset_minutes: Option<i32>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            database_file: PathBuf::from(DEFAULT_DATABASE_FILE),
            utc_offset_minutes: None,
        }
    }
}

pub struct SettingsStore {
    data_dir: PathBuf,
    path: PathBuf,
    data: RwLock<TrackerSettings>,
}

impl SettingsStore {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        let path = data_dir.join(SETTINGS_FILE);
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings in {}: {err}", path.display());
                TrackerSettings::default()
            })
        } else {
            TrackerSettings::default()
        };

        Ok(Self {
            data_dir,
            path,
            data: RwLock::new(data),
        })
    }

    /// `$SLEEPTRACKER_DATA_DIR`, else `$HOME/.local/state/sleeptracker`, else
    /// the working directory.
    pub fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        match std::env::var("HOME") {
            Ok(home) => PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("sleeptracker"),
            Err(_) => PathBuf::from("."),
        }
    }

    pub fn settings(&self) -> TrackerSettings {
        self.read().clone()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.read().database_file)
    }

    pub fn history_formatter(&self) -> HistoryFormatter {
        match self.read().utc_offset_minutes {
            Some(minutes) => HistoryFormatter::with_offset_minutes(minutes).unwrap_or_else(|| {
                warn!("UTC offset of {minutes} minutes is out of range; using local time");
                HistoryFormatter::local()
            }),
            None => HistoryFormatter::local(),
        }
    }

    pub fn update(&self, settings: TrackerSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = settings;
        self.persist(&guard)
    }

    /// Writes the current settings out when no file exists yet, so there is
    /// something on disk to edit. Returns whether a file was written.
    pub fn save_if_missing(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.update(self.settings())?;
        Ok(true)
    }

    fn persist(&self, data: &TrackerSettings) -> Result<()> {
        fs::create_dir_all(&self.data_dir).with_context(|| {
            format!("Failed to create data directory {}", self.data_dir.display())
        })?;
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, TrackerSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// `SLEEPTRACKER_DEBUG=1` (or `true`) turns on debug logging.
pub fn debug_enabled() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
