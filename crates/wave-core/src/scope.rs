//! Configuration scopes and filesystem layout
//!
//! A scope is a precedence level at which plugin state is persisted
//! independently. Precedence is `local > project > user`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WaveError};

const SETTINGS_FILE: &str = "settings.json";
const SETTINGS_LOCAL_FILE: &str = "settings.local.json";
const WAVE_DIR: &str = ".wave";

/// Installation scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// User scope (~/.wave/settings.json)
    #[default]
    User,
    /// Project scope (.wave/settings.json)
    Project,
    /// Local scope (.wave/settings.local.json, not version controlled)
    Local,
}

impl Scope {
    /// All scopes in precedence order, most specific first.
    pub fn precedence() -> [Scope; 3] {
        [Scope::Local, Scope::Project, Scope::User]
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Project => write!(f, "project"),
            Self::Local => write!(f, "local"),
        }
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Scope::User),
            "project" => Ok(Scope::Project),
            "local" => Ok(Scope::Local),
            other => Err(format!("unknown scope: {}", other)),
        }
    }
}

/// Filesystem layout for all persisted plugin state.
///
/// Resolves per-scope settings files and plugin directories, and the
/// user-level marketplace data directory.
#[derive(Debug, Clone)]
pub struct WavePaths {
    home_dir: PathBuf,
    project_dir: PathBuf,
}

impl WavePaths {
    /// Resolve from the real home directory and current working directory.
    pub fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().ok_or(WaveError::HomeNotFound)?;
        let project_dir = std::env::current_dir()?;
        Ok(Self {
            home_dir,
            project_dir,
        })
    }

    /// Create with explicit directories (for testing).
    pub fn with_dirs(home_dir: PathBuf, project_dir: PathBuf) -> Self {
        Self {
            home_dir,
            project_dir,
        }
    }

    /// Settings file for a scope.
    pub fn settings_path(&self, scope: Scope) -> PathBuf {
        match scope {
            Scope::User => self.home_dir.join(WAVE_DIR).join(SETTINGS_FILE),
            Scope::Project => self.project_dir.join(WAVE_DIR).join(SETTINGS_FILE),
            Scope::Local => self.project_dir.join(WAVE_DIR).join(SETTINGS_LOCAL_FILE),
        }
    }

    /// Directory plugin content is materialized into for a scope.
    pub fn plugins_dir(&self, scope: Scope) -> PathBuf {
        match scope {
            Scope::User => self.home_dir.join(WAVE_DIR).join("plugins"),
            Scope::Project => self.project_dir.join(WAVE_DIR).join("plugins"),
            Scope::Local => self.project_dir.join(WAVE_DIR).join("plugins.local"),
        }
    }

    /// Materialized path for a single plugin within a scope.
    pub fn plugin_install_dir(&self, scope: Scope, marketplace: &str, plugin: &str) -> PathBuf {
        self.plugins_dir(scope).join(marketplace).join(plugin)
    }

    /// User-level data directory holding marketplace state.
    pub fn marketplace_data_dir(&self) -> PathBuf {
        self.home_dir.join(WAVE_DIR).join("marketplaces")
    }

    /// Registry file listing user-added marketplaces.
    pub fn marketplaces_file(&self) -> PathBuf {
        self.marketplace_data_dir().join("marketplaces.json")
    }

    /// Cache directory for fetched marketplace sources.
    pub fn marketplace_cache_dir(&self) -> PathBuf {
        self.marketplace_data_dir().join("cache")
    }
}
