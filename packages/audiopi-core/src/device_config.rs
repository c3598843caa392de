//! Persisted device configuration.
//!
//! A single JSON object on disk, typically `/etc/audio-pi/config.json`. Only
//! `device_name` is interpreted; every other key is carried through untouched
//! so other tools can share the file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AudioPiError, AudioPiResult};

const DEVICE_NAME_KEY: &str = "device_name";

/// The on-disk document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceConfig(Map<String, Value>);

impl DeviceConfig {
    /// The stored device name, if present and a string.
    pub fn device_name(&self) -> Option<&str> {
        self.0.get(DEVICE_NAME_KEY).and_then(Value::as_str)
    }

    pub fn set_device_name(&mut self, name: impl Into<String>) {
        self.0
            .insert(DEVICE_NAME_KEY.to_string(), Value::String(name.into()));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Reads and writes the device config document.
///
/// Read-modify-write cycles are serialized by an internal lock so two
/// concurrent renames cannot interleave.
pub struct ConfigStore {
    path: PathBuf,
    default_name: String,
    lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, default_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_name: default_name.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the document.
    ///
    /// Returns an empty document if the file doesn't exist or is invalid.
    pub fn load(&self) -> DeviceConfig {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                log::warn!(
                    "[Config] Ignoring unreadable {}: {}",
                    self.path.display(),
                    e
                );
                DeviceConfig::default()
            }),
            Err(_) => DeviceConfig::default(),
        }
    }

    /// Writes the document via a temp file and rename, creating the parent
    /// directory if needed.
    pub fn save(&self, config: &DeviceConfig) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let temp_path = self.temp_path();
        let contents = serde_json::to_string_pretty(config)?;

        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, &self.path)
    }

    /// Loads, applies `f`, and saves while holding the store lock.
    pub fn update<F>(&self, f: F) -> std::io::Result<DeviceConfig>
    where
        F: FnOnce(&mut DeviceConfig),
    {
        let _guard = self.lock.lock();
        let mut config = self.load();
        f(&mut config);
        self.save(&config)?;
        Ok(config)
    }

    /// Current device name, or the configured default when unset.
    pub fn device_name(&self) -> String {
        self.load()
            .device_name()
            .map(str::to_string)
            .unwrap_or_else(|| self.default_name.clone())
    }

    /// Renames the device, preserving all other keys.
    pub fn set_device_name(&self, name: &str) -> AudioPiResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AudioPiError::InvalidRequest(
                "name must not be empty".into(),
            ));
        }

        self.update(|config| config.set_device_name(name))
            .map_err(|e| {
                log::error!("[Config] Failed to write {}: {}", self.path.display(), e);
                AudioPiError::Persistence(e.to_string())
            })?;

        log::info!("[Config] Device renamed to '{}'", name);
        Ok(name.to_string())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
