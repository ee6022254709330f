//! Scope Store
//!
//! Reads and writes one persisted settings record per scope. All other
//! components go through this interface; nothing else touches the settings
//! files directly.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WaveError};
use crate::scope::{Scope, WavePaths};
use crate::types::InstalledPluginRecord;

/// Per-scope settings record.
///
/// Absent file is equivalent to the default record; scopes materialize
/// their file lazily on first write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsRecord {
    /// Explicit enable/disable overrides, keyed by `name@marketplace`.
    /// Absence of a key means "no opinion" at this scope.
    #[serde(default, rename = "enabledPlugins")]
    pub enabled_plugins: BTreeMap<String, bool>,
    /// Plugins installed at this scope.
    #[serde(default, rename = "installedPlugins")]
    pub installed_plugins: Vec<InstalledPluginRecord>,
}

/// Scope Store - owns the per-scope settings files.
pub struct ScopeStore {
    paths: WavePaths,
}

impl ScopeStore {
    pub fn new(paths: WavePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &WavePaths {
        &self.paths
    }

    /// Load the settings record for a scope.
    ///
    /// Returns the default record when the file does not exist. A file
    /// that exists but does not parse is a `ConfigCorrupt` error; user
    /// state is never silently discarded.
    pub fn load(&self, scope: Scope) -> Result<SettingsRecord> {
        let path = self.paths.settings_path(scope);

        if !path.exists() {
            return Ok(SettingsRecord::default());
        }

        let content = fs::read_to_string(&path)?;
        let record: SettingsRecord =
            serde_json::from_str(&content).map_err(|e| WaveError::ConfigCorrupt {
                path: path.clone(),
                message: e.to_string(),
            })?;

        Ok(record)
    }

    /// Save the settings record for a scope via atomic replace.
    ///
    /// Serializes to a temp file in the target directory, then renames
    /// over the settings file, so a crash mid-write never corrupts
    /// existing settings.
    pub fn save(&self, scope: Scope, record: &SettingsRecord) -> Result<()> {
        let path = self.paths.settings_path(scope);
        let dir = path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;

        let content =
            serde_json::to_string_pretty(record).map_err(|e| WaveError::ConfigCorrupt {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        fs::write(tmp.path(), content)?;
        tmp.persist(&path).map_err(|e| WaveError::Io(e.error))?;

        Ok(())
    }

    /// Apply a mutation to one scope's record as a single read-modify-write.
    ///
    /// Re-reads the file immediately before writing to narrow the
    /// lost-update window against concurrent processes.
    pub fn mutate<F>(&self, scope: Scope, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut SettingsRecord),
    {
        let mut record = self.load(scope)?;
        mutate(&mut record);
        self.save(scope, &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_store() -> (ScopeStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let paths = WavePaths::with_dirs(temp.path().join("home"), temp.path().join("repo"));
        (ScopeStore::new(paths), temp)
    }

    fn sample_record() -> SettingsRecord {
        let mut record = SettingsRecord::default();
        record
            .enabled_plugins
            .insert("test-plugin@market".to_string(), true);
        record.installed_plugins.push(InstalledPluginRecord {
            name: "test-plugin".to_string(),
            marketplace: "market".to_string(),
            version: "1.0.0".to_string(),
            scope: Scope::User,
            installed_at: "2025-01-01T00:00:00Z".to_string(),
            last_updated: "2025-01-01T00:00:00Z".to_string(),
        });
        record
    }

    #[test]
    fn load_absent_file_returns_default() {
        let (store, _temp) = create_test_store();
        let record = store.load(Scope::User).unwrap();
        assert_eq!(record, SettingsRecord::default());
    }

    #[test]
    fn save_load_roundtrip() {
        let (store, _temp) = create_test_store();
        let record = sample_record();

        store.save(Scope::Project, &record).unwrap();
        let loaded = store.load(Scope::Project).unwrap();

        assert_eq!(loaded, record);
    }

    #[test]
    fn save_writes_camel_case_keys() {
        let (store, _temp) = create_test_store();
        store.save(Scope::User, &sample_record()).unwrap();

        let path = store.paths().settings_path(Scope::User);
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("enabledPlugins"));
        assert!(content.contains("installedPlugins"));
        assert!(content.contains("\"test-plugin@market\": true"));
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_reset() {
        let (store, _temp) = create_test_store();
        let path = store.paths().settings_path(Scope::User);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let err = store.load(Scope::User).unwrap_err();
        match err {
            WaveError::ConfigCorrupt { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected ConfigCorrupt, got {:?}", other),
        }
    }

    #[test]
    fn save_replaces_existing_file_atomically() {
        let (store, _temp) = create_test_store();
        store.save(Scope::User, &sample_record()).unwrap();
        store.save(Scope::User, &SettingsRecord::default()).unwrap();

        // No temp file residue, and the result parses.
        let path = store.paths().settings_path(Scope::User);
        let dir = path.parent().unwrap();
        let entries: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries, vec![path.clone()]);
        assert_eq!(store.load(Scope::User).unwrap(), SettingsRecord::default());
    }

    #[test]
    fn scopes_are_independent() {
        let (store, _temp) = create_test_store();
        store.save(Scope::User, &sample_record()).unwrap();

        assert_eq!(
            store.load(Scope::Project).unwrap(),
            SettingsRecord::default()
        );
        assert_eq!(store.load(Scope::Local).unwrap(), SettingsRecord::default());
    }

    #[test]
    fn mutate_is_read_modify_write() {
        let (store, _temp) = create_test_store();
        store
            .mutate(Scope::Local, |r| {
                r.enabled_plugins.insert("a@m".to_string(), false);
            })
            .unwrap();
        store
            .mutate(Scope::Local, |r| {
                r.enabled_plugins.insert("b@m".to_string(), true);
            })
            .unwrap();

        let record = store.load(Scope::Local).unwrap();
        assert_eq!(record.enabled_plugins.len(), 2);
    }
}
