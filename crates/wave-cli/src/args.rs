use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use wave_core::Scope;

#[derive(Parser)]
#[command(name = "wave-plugin")]
#[command(about = "Plugin manager for the Wave terminal assistant")]
#[command(version)]
pub struct Cli {
    /// Home directory override (default: $HOME)
    #[arg(long, global = true)]
    pub home_dir: Option<PathBuf>,

    /// Project directory override (default: current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage marketplaces
    Marketplace {
        #[command(subcommand)]
        action: MarketplaceAction,
    },

    /// Manage plugins
    Plugin {
        #[command(subcommand)]
        action: PluginAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum MarketplaceAction {
    /// Register a marketplace from a directory or git repository
    Add {
        /// Local directory path or git URL
        source: String,

        /// Treat the source as a git repository
        #[arg(long)]
        git: bool,

        /// Git ref (branch or tag) to pin
        #[arg(long, requires = "git")]
        r#ref: Option<String>,
    },

    /// Remove a marketplace (installed plugins are kept)
    Remove {
        /// Marketplace name
        name: String,
    },

    /// Re-fetch a marketplace's plugin manifest
    Update {
        /// Marketplace name
        name: String,
    },

    /// List registered marketplaces
    List,
}

#[derive(Subcommand)]
pub enum PluginAction {
    /// Install a plugin into a scope
    Install {
        /// Plugin identifier (name@marketplace)
        plugin: String,

        /// Scope to install into
        #[arg(short, long, default_value = "user")]
        scope: Scope,
    },

    /// Uninstall a plugin from its owning scope
    Uninstall {
        /// Plugin identifier (name@marketplace)
        plugin: String,
    },

    /// Re-install a plugin from the current manifest
    Update {
        /// Plugin identifier (name@marketplace)
        plugin: String,
    },

    /// Enable a plugin at a scope
    Enable {
        /// Plugin identifier (name@marketplace)
        plugin: String,

        /// Scope to write the override at
        #[arg(short, long, default_value = "user")]
        scope: Scope,
    },

    /// Disable a plugin at a scope
    Disable {
        /// Plugin identifier (name@marketplace)
        plugin: String,

        /// Scope to write the override at
        #[arg(short, long, default_value = "user")]
        scope: Scope,
    },

    /// List the merged plugin catalog
    List,
}
