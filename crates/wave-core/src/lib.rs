pub mod catalog;
pub mod error;
pub mod fetcher;
pub mod ledger;
pub mod manager;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod settings;
pub mod types;

pub use catalog::CatalogEntry;
pub use error::{Result, WaveError};
pub use fetcher::{GitDirFetcher, SourceFetcher};
pub use ledger::Ledger;
pub use manager::PluginManager;
pub use registry::MarketplaceRegistry;
pub use resolver::{EffectiveState, Resolver};
pub use scope::{Scope, WavePaths};
pub use settings::{ScopeStore, SettingsRecord};
pub use types::{
    plugin_key, InstalledPluginRecord, ManifestEntry, Marketplace, MarketplaceManifest,
    PluginDescriptor, SourceDescriptor,
};
