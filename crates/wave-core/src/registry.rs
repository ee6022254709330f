//! Marketplace Registry
//!
//! Tracks registered marketplaces and caches their manifests in memory for
//! the session. Built-in marketplaces are injected at construction, listed
//! first, and can never be removed; user-added marketplaces are persisted
//! in registration order.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::{Result, WaveError};
use crate::types::{Marketplace, MarketplaceManifest, SourceDescriptor};

pub struct MarketplaceRegistry {
    /// Registry file for user-added marketplaces
    registry_file: PathBuf,
    /// Built-in marketplaces, never persisted
    builtins: Vec<Marketplace>,
    /// Session manifest cache, keyed by marketplace name
    cache: HashMap<String, MarketplaceManifest>,
}

impl MarketplaceRegistry {
    pub fn new(registry_file: PathBuf, builtins: Vec<Marketplace>) -> Self {
        Self {
            registry_file,
            builtins,
            cache: HashMap::new(),
        }
    }

    /// All marketplaces: built-ins first, then user-added in registration
    /// order.
    pub fn list(&self) -> Result<Vec<Marketplace>> {
        let mut result = self.builtins.clone();
        result.extend(self.load_registered()?);
        Ok(result)
    }

    /// Look up a marketplace by name.
    pub fn get(&self, name: &str) -> Result<Option<Marketplace>> {
        Ok(self.list()?.into_iter().find(|m| m.name == name))
    }

    /// Register a new marketplace.
    pub fn add(&self, name: &str, source: SourceDescriptor) -> Result<Marketplace> {
        if self.get(name)?.is_some() {
            return Err(WaveError::DuplicateMarketplace {
                name: name.to_string(),
            });
        }

        let marketplace = Marketplace {
            name: name.to_string(),
            source,
            is_builtin: false,
        };

        let mut registered = self.load_registered()?;
        registered.push(marketplace.clone());
        self.save_registered(&registered)?;

        Ok(marketplace)
    }

    /// Drop a marketplace and its cached manifest. Built-ins are refused.
    /// Installed plugins that originated from it are left untouched.
    pub fn remove(&mut self, name: &str) -> Result<Marketplace> {
        if self.builtins.iter().any(|m| m.name == name) {
            return Err(WaveError::BuiltinMarketplace {
                name: name.to_string(),
            });
        }

        let mut registered = self.load_registered()?;
        let position = registered
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| WaveError::MarketplaceNotFound {
                name: name.to_string(),
            })?;

        let removed = registered.remove(position);
        self.save_registered(&registered)?;
        self.cache.remove(name);

        Ok(removed)
    }

    pub fn cached_manifest(&self, name: &str) -> Option<&MarketplaceManifest> {
        self.cache.get(name)
    }

    /// Replace the cached manifest for a marketplace.
    pub fn cache_manifest(&mut self, name: &str, manifest: MarketplaceManifest) {
        self.cache.insert(name.to_string(), manifest);
    }

    pub fn invalidate(&mut self, name: &str) {
        self.cache.remove(name);
    }

    fn load_registered(&self) -> Result<Vec<Marketplace>> {
        if !self.registry_file.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.registry_file)?;
        serde_json::from_str(&content).map_err(|e| WaveError::ConfigCorrupt {
            path: self.registry_file.clone(),
            message: e.to_string(),
        })
    }

    fn save_registered(&self, registered: &[Marketplace]) -> Result<()> {
        if let Some(parent) = self.registry_file.parent() {
            fs::create_dir_all(parent)?;
        }

        let content =
            serde_json::to_string_pretty(registered).map_err(|e| WaveError::ConfigCorrupt {
                path: self.registry_file.clone(),
                message: e.to_string(),
            })?;

        let dir = self.registry_file.parent().unwrap_or(&self.registry_file);
        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        fs::write(tmp.path(), content)?;
        tmp.persist(&self.registry_file)
            .map_err(|e| WaveError::Io(e.error))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn directory_source(path: &str) -> SourceDescriptor {
        SourceDescriptor::Directory {
            path: path.to_string(),
        }
    }

    fn create_test_registry(builtins: Vec<Marketplace>) -> (MarketplaceRegistry, TempDir) {
        let temp = TempDir::new().unwrap();
        let registry = MarketplaceRegistry::new(temp.path().join("marketplaces.json"), builtins);
        (registry, temp)
    }

    fn builtin(name: &str) -> Marketplace {
        Marketplace {
            name: name.to_string(),
            source: directory_source("/usr/share/wave/marketplace"),
            is_builtin: true,
        }
    }

    #[test]
    fn add_and_list_preserves_registration_order() {
        let (registry, _temp) = create_test_registry(vec![builtin("official")]);

        registry.add("alpha", directory_source("/srv/alpha")).unwrap();
        registry.add("beta", directory_source("/srv/beta")).unwrap();

        let names: Vec<String> = registry.list().unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["official", "alpha", "beta"]);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let (registry, _temp) = create_test_registry(vec![builtin("official")]);

        registry.add("alpha", directory_source("/srv/alpha")).unwrap();
        let err = registry
            .add("alpha", directory_source("/srv/other"))
            .unwrap_err();
        assert!(matches!(err, WaveError::DuplicateMarketplace { .. }));

        // Collision with a builtin name is also a duplicate.
        let err = registry
            .add("official", directory_source("/srv/official"))
            .unwrap_err();
        assert!(matches!(err, WaveError::DuplicateMarketplace { .. }));
    }

    #[test]
    fn remove_builtin_is_refused() {
        let (mut registry, _temp) = create_test_registry(vec![builtin("official")]);

        let err = registry.remove("official").unwrap_err();
        assert!(matches!(err, WaveError::BuiltinMarketplace { .. }));
        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn remove_unknown_marketplace() {
        let (mut registry, _temp) = create_test_registry(Vec::new());

        let err = registry.remove("ghost").unwrap_err();
        assert!(matches!(err, WaveError::MarketplaceNotFound { .. }));
    }

    #[test]
    fn remove_drops_cached_manifest() {
        let (mut registry, _temp) = create_test_registry(Vec::new());

        registry.add("alpha", directory_source("/srv/alpha")).unwrap();
        registry.cache_manifest(
            "alpha",
            MarketplaceManifest {
                name: "alpha".to_string(),
                plugins: Vec::new(),
            },
        );

        registry.remove("alpha").unwrap();
        assert!(registry.cached_manifest("alpha").is_none());
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn registered_marketplaces_survive_reload() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("marketplaces.json");

        let registry = MarketplaceRegistry::new(file.clone(), Vec::new());
        registry.add("alpha", directory_source("/srv/alpha")).unwrap();

        let reloaded = MarketplaceRegistry::new(file, Vec::new());
        let list = reloaded.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "alpha");
        assert!(!list[0].is_builtin);
    }

    #[test]
    fn corrupt_registry_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("marketplaces.json");
        fs::write(&file, "[ not json").unwrap();

        let registry = MarketplaceRegistry::new(file, Vec::new());
        assert!(matches!(
            registry.list().unwrap_err(),
            WaveError::ConfigCorrupt { .. }
        ));
    }
}
