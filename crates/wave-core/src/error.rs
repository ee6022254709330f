use std::path::PathBuf;
use thiserror::Error;

use crate::scope::Scope;

#[derive(Debug, Error)]
pub enum WaveError {
    #[error("Settings file is corrupt: {path} ({message})")]
    ConfigCorrupt { path: PathBuf, message: String },

    #[error("Marketplace already exists: {name}")]
    DuplicateMarketplace { name: String },

    #[error("Marketplace not found: {name}")]
    MarketplaceNotFound { name: String },

    #[error("Cannot remove built-in marketplace: {name}")]
    BuiltinMarketplace { name: String },

    #[error("Failed to fetch marketplace manifest for {name}: {message}")]
    ManifestFetch { name: String, message: String },

    #[error("Plugin not found: {name} in marketplace {marketplace}")]
    PluginNotFound { name: String, marketplace: String },

    #[error("Plugin already installed: {key} in {scope} scope")]
    AlreadyInstalled { key: String, scope: Scope },

    #[error("Plugin not installed: {key}")]
    NotInstalled { key: String },

    #[error("Invalid plugin identifier: '{key}' - expected name@marketplace")]
    InvalidPluginKey { key: String },

    #[error("Failed to install plugin {key}: {message}")]
    Install { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Home directory not found")]
    HomeNotFound,

    #[error("Git error: {0}")]
    Git(String),
}

pub type Result<T> = std::result::Result<T, WaveError>;

impl WaveError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MarketplaceNotFound { .. } | Self::PluginNotFound { .. } => 2,
            Self::NotInstalled { .. } => 3,
            Self::AlreadyInstalled { .. } | Self::DuplicateMarketplace { .. } => 4,
            Self::BuiltinMarketplace { .. } => 5,
            Self::ConfigCorrupt { .. } => 6,
            _ => 1,
        }
    }
}
