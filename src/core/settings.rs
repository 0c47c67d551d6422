//! User-editable scan settings and their JSON-backed store.

use crate::core::error::{Error, Result};
use crate::core::types::CheckKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Settings file name inside the data directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// Per-run scan configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSettings {
    /// Directories searched (non-recursively) for files to hash
    #[serde(default)]
    pub scanned_directories: Vec<PathBuf>,
    /// Directories skipped even when listed in `scanned_directories`
    #[serde(default)]
    pub excluded_directories: HashSet<PathBuf>,
    /// Content hashes never reported as malicious
    #[serde(default)]
    pub excluded_hashes: HashSet<String>,
    /// Process-name substrings never flagged
    #[serde(default)]
    pub excluded_processes: HashSet<String>,
    /// Run the file hash check
    #[serde(default)]
    pub scan_hashes: bool,
    /// Run the outbound connection check
    #[serde(default)]
    pub scan_connections: bool,
    /// Run the process check
    #[serde(default)]
    pub scan_processes: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            scanned_directories: default_scanned_directories(),
            excluded_directories: HashSet::new(),
            excluded_hashes: HashSet::new(),
            excluded_processes: HashSet::new(),
            scan_hashes: true,
            scan_connections: true,
            scan_processes: true,
        }
    }
}

impl ScanSettings {
    /// Whether the given check is enabled.
    pub fn is_enabled(&self, check: CheckKind) -> bool {
        match check {
            CheckKind::Hashes => self.scan_hashes,
            CheckKind::Connections => self.scan_connections,
            CheckKind::Processes => self.scan_processes,
        }
    }

    /// Checks enabled for this run, in report order.
    pub fn enabled_checks(&self) -> Vec<CheckKind> {
        [CheckKind::Hashes, CheckKind::Connections, CheckKind::Processes]
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }

    /// Whether no check would run.
    pub fn nothing_enabled(&self) -> bool {
        !(self.scan_hashes || self.scan_connections || self.scan_processes)
    }
}

/// Home directory, common user folders and the platform temp directory.
pub fn default_scanned_directories() -> Vec<PathBuf> {
    let mut dirs_to_check = Vec::new();

    if let Some(home) = dirs::home_dir() {
        dirs_to_check.push(home.clone());
        for sub in ["Desktop", "Downloads", "Documents"] {
            dirs_to_check.push(home.join(sub));
        }
    }

    #[cfg(windows)]
    dirs_to_check.push(PathBuf::from("C:/Windows/Temp"));

    #[cfg(not(windows))]
    dirs_to_check.push(PathBuf::from("/tmp"));

    dirs_to_check
}

/// Source of the current scan settings.
pub trait SettingsProvider: Send + Sync {
    /// Current settings, with defaults already applied.
    fn scan_settings(&self) -> Result<ScanSettings>;
}

/// Fixed settings, mostly for embedding and tests.
impl SettingsProvider for ScanSettings {
    fn scan_settings(&self) -> Result<ScanSettings> {
        Ok(self.clone())
    }
}

/// Single-record settings store backed by a JSON file.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Create a store for the given settings file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store located in the given data directory.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(SETTINGS_FILE))
    }

    /// Path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored settings, or defaults if none were saved yet.
    pub fn load(&self) -> Result<ScanSettings> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings at {:?}, using defaults", self.path);
                return Ok(ScanSettings::default());
            }
            Err(e) => return Err(Error::file_read(&self.path, e)),
        };

        if contents.trim().is_empty() {
            return Ok(ScanSettings::default());
        }

        serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigLoad(format!("Invalid settings in {:?}: {}", self.path, e)))
    }

    /// Replace the stored settings.
    pub fn save(&self, settings: &ScanSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::file_write(parent, e))?;
        }
        let contents = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, contents).map_err(|e| Error::file_write(&self.path, e))
    }

    /// Import settings from another JSON file, validating the shape.
    pub fn import(&self, source: &Path) -> Result<ScanSettings> {
        let contents =
            std::fs::read_to_string(source).map_err(|e| Error::file_read(source, e))?;
        let settings: ScanSettings = serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigLoad(format!("Invalid settings in {:?}: {}", source, e)))?;
        self.save(&settings)?;
        Ok(settings)
    }

    /// Remove stored settings so defaults apply again.
    pub fn reset(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::file_write(&self.path, e)),
        }
    }
}

impl SettingsProvider for SettingsStore {
    fn scan_settings(&self) -> Result<ScanSettings> {
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_enable_everything() {
        let settings = ScanSettings::default();
        assert!(settings.scan_hashes && settings.scan_connections && settings.scan_processes);
        assert_eq!(settings.enabled_checks().len(), 3);
        assert!(!settings.nothing_enabled());
        #[cfg(not(windows))]
        assert!(settings
            .scanned_directories
            .contains(&PathBuf::from("/tmp")));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), ScanSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::in_dir(dir.path());

        let mut settings = ScanSettings::default();
        settings.scan_connections = false;
        settings.excluded_hashes.insert("abc".to_string());
        store.save(&settings).unwrap();

        let loaded = store.scan_settings().unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(
            loaded.enabled_checks(),
            vec![CheckKind::Hashes, CheckKind::Processes]
        );
    }

    #[test]
    fn test_camel_case_fields() {
        let json = r#"{
            "scannedDirectories": ["/data"],
            "excludedHashes": ["h1"],
            "scanHashes": true
        }"#;
        let settings: ScanSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.scanned_directories, vec![PathBuf::from("/data")]);
        assert!(settings.scan_hashes);
        assert!(!settings.scan_processes);
    }

    #[test]
    fn test_malformed_settings_rejected() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::in_dir(dir.path());
        std::fs::write(store.path(), r#"{"scanHashes": "yes"}"#).unwrap();
        assert!(matches!(store.load(), Err(Error::ConfigLoad(_))));
    }

    #[test]
    fn test_import_and_reset() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::in_dir(dir.path());
        let source = dir.path().join("incoming.json");
        std::fs::write(&source, r#"{"scanProcesses": true, "excludedProcesses": ["code"]}"#)
            .unwrap();

        let imported = store.import(&source).unwrap();
        assert!(imported.excluded_processes.contains("code"));
        assert_eq!(store.load().unwrap(), imported);

        store.reset().unwrap();
        assert_eq!(store.load().unwrap(), ScanSettings::default());
        store.reset().unwrap();
    }
}
