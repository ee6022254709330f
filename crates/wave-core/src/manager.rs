//! Plugin Manager
//!
//! High-level command surface over the registry, scope store, ledger,
//! resolver, and fetcher. One command at a time; every mutation re-reads
//! the affected settings file immediately before writing.

use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{merge_catalog, CatalogEntry};
use crate::error::{Result, WaveError};
use crate::fetcher::{GitDirFetcher, SourceFetcher};
use crate::ledger::Ledger;
use crate::registry::MarketplaceRegistry;
use crate::resolver::{EffectiveState, Resolver};
use crate::scope::{Scope, WavePaths};
use crate::settings::ScopeStore;
use crate::types::{
    plugin_key, InstalledPluginRecord, Marketplace, MarketplaceManifest, PluginDescriptor,
    SourceDescriptor,
};

pub struct PluginManager {
    paths: WavePaths,
    store: ScopeStore,
    registry: MarketplaceRegistry,
    fetcher: Box<dyn SourceFetcher>,
}

impl PluginManager {
    /// Create against the real home and current working directory.
    pub fn new(builtins: Vec<Marketplace>) -> Result<Self> {
        let paths = WavePaths::new()?;
        let fetcher = Box::new(GitDirFetcher::new(paths.marketplace_cache_dir()));
        Ok(Self::with_parts(paths, builtins, fetcher))
    }

    /// Create with explicit paths and fetcher (for testing).
    pub fn with_parts(
        paths: WavePaths,
        builtins: Vec<Marketplace>,
        fetcher: Box<dyn SourceFetcher>,
    ) -> Self {
        let store = ScopeStore::new(paths.clone());
        let registry = MarketplaceRegistry::new(paths.marketplaces_file(), builtins);
        Self {
            paths,
            store,
            registry,
            fetcher,
        }
    }

    pub fn store(&self) -> &ScopeStore {
        &self.store
    }

    // ========== Marketplaces ==========

    /// Register a marketplace from a source descriptor.
    ///
    /// The source is validated by fetching its manifest; the marketplace
    /// name comes from the manifest, falling back to the source basename.
    pub fn add_marketplace(&mut self, source: SourceDescriptor) -> Result<Marketplace> {
        let hint = source
            .derived_name()
            .unwrap_or_else(|| "marketplace".to_string());
        let manifest = self.fetcher.fetch_manifest(&hint, &source, true)?;

        let name = if manifest.name.is_empty() {
            hint.clone()
        } else {
            manifest.name.clone()
        };

        let marketplace = match self.registry.add(&name, source) {
            Ok(m) => m,
            Err(e) => {
                // Drop the content fetched under the provisional name.
                let _ = self.fetcher.evict(&hint);
                return Err(e);
            }
        };

        if name != hint {
            let _ = self.fetcher.evict(&hint);
        }
        self.registry.cache_manifest(&name, manifest);

        Ok(marketplace)
    }

    /// Re-fetch a marketplace's manifest, replacing the cached copy.
    ///
    /// A failed fetch leaves the previous cached manifest intact.
    pub fn update_marketplace(&mut self, name: &str) -> Result<MarketplaceManifest> {
        let marketplace =
            self.registry
                .get(name)?
                .ok_or_else(|| WaveError::MarketplaceNotFound {
                    name: name.to_string(),
                })?;

        let manifest = self.fetcher.fetch_manifest(name, &marketplace.source, true)?;
        self.registry.cache_manifest(name, manifest.clone());

        Ok(manifest)
    }

    /// Remove a marketplace. Plugins installed from it remain installed
    /// (and uninstallable) as orphans.
    pub fn remove_marketplace(&mut self, name: &str) -> Result<Marketplace> {
        let removed = self.registry.remove(name)?;
        self.fetcher.evict(name)?;
        Ok(removed)
    }

    pub fn list_marketplaces(&self) -> Result<Vec<Marketplace>> {
        self.registry.list()
    }

    /// Cached manifest for a marketplace, fetching on first access.
    pub fn load_marketplace_manifest(&mut self, name: &str) -> Result<MarketplaceManifest> {
        if let Some(manifest) = self.registry.cached_manifest(name) {
            return Ok(manifest.clone());
        }

        let marketplace =
            self.registry
                .get(name)?
                .ok_or_else(|| WaveError::MarketplaceNotFound {
                    name: name.to_string(),
                })?;

        let manifest = self
            .fetcher
            .fetch_manifest(name, &marketplace.source, false)?;
        self.registry.cache_manifest(name, manifest.clone());

        Ok(manifest)
    }

    // ========== Install / Uninstall / Update ==========

    /// Install a plugin into a scope.
    ///
    /// The materialized files land first; the ledger record and the
    /// explicit `enabled = true` override are then persisted together in a
    /// single settings write. A failed write rolls the files back, so no
    /// partial install is ever recorded.
    pub fn install_plugin(
        &mut self,
        name: &str,
        marketplace: &str,
        scope: Scope,
    ) -> Result<InstalledPluginRecord> {
        let key = plugin_key(name, marketplace);

        if let Some(existing) = Ledger::new(&self.store).installed_scope(name, marketplace)? {
            return Err(WaveError::AlreadyInstalled {
                key,
                scope: existing,
            });
        }

        let descriptor = self.resolve_descriptor(name, marketplace)?;
        let target = self.materialize(&descriptor, scope)?;

        let version = descriptor
            .version
            .clone()
            .unwrap_or_else(|| chrono::Utc::now().format("%Y%m%d%H%M%S").to_string());
        let now = chrono::Utc::now().to_rfc3339();
        let record = InstalledPluginRecord {
            name: name.to_string(),
            marketplace: marketplace.to_string(),
            version,
            scope,
            installed_at: now.clone(),
            last_updated: now,
        };

        self.commit_install(record.clone(), &target).map(|()| record)
    }

    /// Uninstall a plugin from its owning scope.
    ///
    /// Removes the materialized files, the ledger record, and the owning
    /// scope's override entry in one settings write; a later reinstall
    /// starts from the default-enabled state.
    pub fn uninstall_plugin(&mut self, name: &str, marketplace: &str) -> Result<Scope> {
        let key = plugin_key(name, marketplace);
        let scope = Ledger::new(&self.store)
            .installed_scope(name, marketplace)?
            .ok_or(WaveError::NotInstalled { key: key.clone() })?;

        let target = self.paths.plugin_install_dir(scope, marketplace, name);
        if target.exists() {
            fs::remove_dir_all(&target)?;
        }

        self.store.mutate(scope, |s| {
            s.installed_plugins
                .retain(|r| !(r.name == name && r.marketplace == marketplace));
            s.enabled_plugins.remove(&key);
        })?;

        Ok(scope)
    }

    /// Update a plugin in place: re-materialize from the current manifest
    /// and rewrite the owning scope's record and override. Overrides held
    /// by other scopes are untouched.
    pub fn update_plugin(
        &mut self,
        name: &str,
        marketplace: &str,
    ) -> Result<InstalledPluginRecord> {
        let key = plugin_key(name, marketplace);
        let previous = Ledger::new(&self.store)
            .record(name, marketplace)?
            .ok_or(WaveError::NotInstalled { key })?;

        let descriptor = self.resolve_descriptor(name, marketplace)?;
        let target = self.materialize(&descriptor, previous.scope)?;

        let version = descriptor
            .version
            .clone()
            .unwrap_or_else(|| previous.version.clone());
        let record = InstalledPluginRecord {
            name: name.to_string(),
            marketplace: marketplace.to_string(),
            version,
            scope: previous.scope,
            installed_at: previous.installed_at.clone(),
            last_updated: chrono::Utc::now().to_rfc3339(),
        };

        self.commit_install(record.clone(), &target).map(|()| record)
    }

    // ========== Enable / Disable ==========

    pub fn enable_plugin(&self, name: &str, marketplace: &str, scope: Scope) -> Result<()> {
        Resolver::new(&self.store).set_enabled(name, marketplace, scope, true)
    }

    pub fn disable_plugin(&self, name: &str, marketplace: &str, scope: Scope) -> Result<()> {
        Resolver::new(&self.store).set_enabled(name, marketplace, scope, false)
    }

    pub fn effective_state(&self, name: &str, marketplace: &str) -> Result<EffectiveState> {
        Resolver::new(&self.store).effective_state(name, marketplace)
    }

    // ========== Catalog ==========

    /// The merged view of every discoverable and installed plugin.
    ///
    /// Marketplaces whose manifest cannot be loaded are skipped rather
    /// than failing the whole catalog; their installed plugins still
    /// appear as orphans.
    pub fn list_catalog(&mut self) -> Result<Vec<CatalogEntry>> {
        let names: Vec<String> = self
            .registry
            .list()?
            .into_iter()
            .map(|m| m.name)
            .collect();

        let mut manifests = Vec::new();
        for name in names {
            if let Ok(manifest) = self.load_marketplace_manifest(&name) {
                manifests.push((name, manifest));
            }
        }

        merge_catalog(&manifests, &self.store)
    }

    // ========== Internals ==========

    fn resolve_descriptor(&mut self, name: &str, marketplace: &str) -> Result<PluginDescriptor> {
        let manifest = self.load_marketplace_manifest(marketplace)?;
        manifest
            .plugins
            .iter()
            .find(|p| p.name == name)
            .map(|entry| PluginDescriptor::from_entry(entry, marketplace))
            .ok_or_else(|| WaveError::PluginNotFound {
                name: name.to_string(),
                marketplace: marketplace.to_string(),
            })
    }

    fn materialize(&mut self, descriptor: &PluginDescriptor, scope: Scope) -> Result<PathBuf> {
        let marketplace =
            self.registry
                .get(&descriptor.marketplace)?
                .ok_or_else(|| WaveError::MarketplaceNotFound {
                    name: descriptor.marketplace.clone(),
                })?;

        let source_root = self
            .fetcher
            .sync_source(&marketplace.name, &marketplace.source, false)
            .map_err(|e| WaveError::Install {
                key: descriptor.key(),
                message: e.to_string(),
            })?;

        let target =
            self.paths
                .plugin_install_dir(scope, &descriptor.marketplace, &descriptor.name);
        self.fetcher
            .materialize_plugin(&source_root, descriptor, &target)?;

        Ok(target)
    }

    /// Persist an install record plus its `enabled = true` override as one
    /// settings write; roll the materialized files back on failure.
    fn commit_install(&self, record: InstalledPluginRecord, target: &Path) -> Result<()> {
        let key = record.key();
        let scope = record.scope;
        let persisted = self.store.mutate(scope, move |s| {
            s.installed_plugins
                .retain(|r| !(r.name == record.name && r.marketplace == record.marketplace));
            s.installed_plugins.push(record);
            s.enabled_plugins.insert(key.clone(), true);
        });

        if let Err(e) = persisted {
            let _ = fs::remove_dir_all(target);
            return Err(e);
        }
        Ok(())
    }
}
