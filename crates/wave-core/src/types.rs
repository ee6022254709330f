//! Plugin and marketplace type definitions
//!
//! Types for marketplace manifests, catalog entries, and installed-plugin
//! records as they appear on the wire and in settings files.

use serde::{Deserialize, Serialize};

use crate::scope::Scope;

/// Marketplace manifest file path relative to a marketplace source root.
pub const MARKETPLACE_MANIFEST_FILE: &str = ".wave-plugin/marketplace.json";

/// Canonical plugin identity key, rendered as `name@marketplace`.
pub fn plugin_key(name: &str, marketplace: &str) -> String {
    format!("{}@{}", name, marketplace)
}

/// Where a marketplace's content comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceDescriptor {
    /// Local directory containing the manifest and plugin subtrees
    Directory { path: String },
    /// Git repository, optionally pinned to a ref
    Git {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        r#ref: Option<String>,
    },
}

impl SourceDescriptor {
    /// Fallback marketplace name when the manifest does not provide one:
    /// the basename of the directory path or git url, stripped of `.git`.
    pub fn derived_name(&self) -> Option<String> {
        let raw = match self {
            Self::Directory { path } => path.trim_end_matches('/'),
            Self::Git { url, .. } => url.trim_end_matches('/'),
        };
        raw.rsplit('/')
            .next()
            .map(|s| s.trim_end_matches(".git").to_string())
            .filter(|s| !s.is_empty())
    }
}

/// A registered marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marketplace {
    /// Marketplace name (unique identifier)
    pub name: String,
    /// Source specification
    pub source: SourceDescriptor,
    /// Built-in marketplaces cannot be removed
    #[serde(default, rename = "isBuiltin")]
    pub is_builtin: bool,
}

/// Marketplace manifest (`.wave-plugin/marketplace.json`)
///
/// External file fetched from the marketplace source; the sole source of
/// truth for discoverable plugins. Never written by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceManifest {
    /// Marketplace name
    pub name: String,
    /// Available plugins
    #[serde(default)]
    pub plugins: Vec<ManifestEntry>,
}

/// Plugin entry as declared in a marketplace manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Plugin name (unique within the marketplace)
    pub name: String,
    /// Install locator relative to the marketplace source root
    /// (e.g. "./plugins/my-plugin")
    pub source: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Version
    #[serde(default)]
    pub version: Option<String>,
}

/// Catalog entry: a manifest entry resolved against a marketplace.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    /// Plugin name
    pub name: String,
    /// Marketplace name
    pub marketplace: String,
    /// Install locator relative to the marketplace source root
    pub source: String,
    /// Description
    pub description: Option<String>,
    /// Version
    pub version: Option<String>,
}

impl PluginDescriptor {
    /// Create from a manifest entry and its marketplace name.
    pub fn from_entry(entry: &ManifestEntry, marketplace: &str) -> Self {
        Self {
            name: entry.name.clone(),
            marketplace: marketplace.to_string(),
            source: entry.source.clone(),
            description: entry.description.clone(),
            version: entry.version.clone(),
        }
    }

    /// Full identifier, `name@marketplace`.
    pub fn key(&self) -> String {
        plugin_key(&self.name, &self.marketplace)
    }
}

/// Installed plugin record persisted in a scope's settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPluginRecord {
    /// Plugin name
    pub name: String,
    /// Marketplace the plugin was installed from
    pub marketplace: String,
    /// Installed version
    pub version: String,
    /// Owning scope
    pub scope: Scope,
    /// Installation timestamp
    #[serde(rename = "installedAt")]
    pub installed_at: String,
    /// Last updated timestamp
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
}

impl InstalledPluginRecord {
    pub fn key(&self) -> String {
        plugin_key(&self.name, &self.marketplace)
    }
}
