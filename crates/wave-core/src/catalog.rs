//! Plugin Catalog Merger
//!
//! Produces the unified discoverable-plus-installed view the presentation
//! layer renders: every manifest entry across marketplaces, left-joined
//! with the ledger and resolver by `(name, marketplace)` key. Installed
//! plugins whose marketplace is gone (orphans) stay visible so they can
//! still be uninstalled.

use crate::error::Result;
use crate::ledger::Ledger;
use crate::resolver::{EffectiveState, Resolver};
use crate::scope::Scope;
use crate::settings::ScopeStore;
use crate::types::{MarketplaceManifest, PluginDescriptor};

/// One row of the merged catalog.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Plugin name
    pub name: String,
    /// Marketplace name (from the manifest, or the ledger for orphans)
    pub marketplace: String,
    /// Install locator, absent for orphans
    pub source: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Version (manifest version, or installed version for orphans)
    pub version: Option<String>,
    /// Whether some scope holds an install record
    pub installed: bool,
    /// Effective enabled flag; None when not installed
    pub enabled: Option<bool>,
    /// Owning scope when installed
    pub scope: Option<Scope>,
}

impl CatalogEntry {
    pub fn key(&self) -> String {
        crate::types::plugin_key(&self.name, &self.marketplace)
    }
}

/// Merge marketplace manifests with per-scope installed state.
///
/// `manifests` pairs each registered marketplace name with its loaded
/// manifest, in listing order.
pub fn merge_catalog(
    manifests: &[(String, MarketplaceManifest)],
    store: &ScopeStore,
) -> Result<Vec<CatalogEntry>> {
    let ledger = Ledger::new(store);
    let resolver = Resolver::new(store);

    let mut entries = Vec::new();

    for (marketplace, manifest) in manifests {
        for entry in &manifest.plugins {
            let descriptor = PluginDescriptor::from_entry(entry, marketplace);
            let scope = ledger.installed_scope(&descriptor.name, marketplace)?;
            let enabled = match scope {
                Some(_) => Some(
                    resolver.effective_state(&descriptor.name, marketplace)?
                        == EffectiveState::Enabled,
                ),
                None => None,
            };
            entries.push(CatalogEntry {
                name: descriptor.name,
                marketplace: descriptor.marketplace,
                source: Some(descriptor.source),
                description: descriptor.description,
                version: descriptor.version,
                installed: scope.is_some(),
                enabled,
                scope,
            });
        }
    }

    // Installed records with no manifest counterpart (marketplace removed
    // or entry withdrawn upstream) are appended from the ledger.
    for record in ledger.records()? {
        let already_listed = entries
            .iter()
            .any(|e| e.name == record.name && e.marketplace == record.marketplace);
        if already_listed {
            continue;
        }

        let enabled = resolver.effective_state(&record.name, &record.marketplace)?
            == EffectiveState::Enabled;
        entries.push(CatalogEntry {
            name: record.name.clone(),
            marketplace: record.marketplace.clone(),
            source: None,
            description: None,
            version: Some(record.version.clone()),
            installed: true,
            enabled: Some(enabled),
            scope: Some(record.scope),
        });
    }

    Ok(entries)
}
