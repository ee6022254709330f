use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;

use wave_core::{PluginManager, Result, SourceDescriptor, WaveError, WavePaths};

mod args;
use args::{Cli, Commands, MarketplaceAction, PluginAction, Shell};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Marketplace { action } => resolve_paths(&cli.home_dir, &cli.project_dir)
            .and_then(|paths| handle_marketplace(action, paths)),
        Commands::Plugin { action } => resolve_paths(&cli.home_dir, &cli.project_dir)
            .and_then(|paths| handle_plugin(action, paths)),
        Commands::Completions { shell } => {
            handle_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn resolve_paths(home_dir: &Option<PathBuf>, project_dir: &Option<PathBuf>) -> Result<WavePaths> {
    match (home_dir, project_dir) {
        (Some(home), Some(project)) => Ok(WavePaths::with_dirs(home.clone(), project.clone())),
        (Some(home), None) => Ok(WavePaths::with_dirs(home.clone(), std::env::current_dir()?)),
        (None, Some(project)) => {
            let home = dirs_home()?;
            Ok(WavePaths::with_dirs(home, project.clone()))
        }
        (None, None) => WavePaths::new(),
    }
}

fn dirs_home() -> Result<PathBuf> {
    dirs::home_dir().ok_or(WaveError::HomeNotFound)
}

fn create_manager(paths: WavePaths) -> PluginManager {
    let fetcher = Box::new(wave_core::GitDirFetcher::new(paths.marketplace_cache_dir()));
    PluginManager::with_parts(paths, Vec::new(), fetcher)
}

fn handle_marketplace(action: MarketplaceAction, paths: WavePaths) -> Result<()> {
    let mut manager = create_manager(paths);

    match action {
        MarketplaceAction::Add { source, git, r#ref } => {
            let descriptor = if git {
                SourceDescriptor::Git {
                    url: source,
                    r#ref,
                }
            } else {
                SourceDescriptor::Directory { path: source }
            };
            let marketplace = manager.add_marketplace(descriptor)?;
            println!(
                "{} Successfully added marketplace: {}",
                "[OK]".green().bold(),
                marketplace.name
            );
        }
        MarketplaceAction::Remove { name } => {
            manager.remove_marketplace(&name)?;
            println!(
                "{} Successfully removed marketplace: {}",
                "[OK]".green().bold(),
                name
            );
        }
        MarketplaceAction::Update { name } => {
            let manifest = manager.update_marketplace(&name)?;
            println!(
                "{} Successfully updated marketplace: {} ({} plugins)",
                "[OK]".green().bold(),
                name,
                manifest.plugins.len()
            );
        }
        MarketplaceAction::List => {
            let marketplaces = manager.list_marketplaces()?;
            if marketplaces.is_empty() {
                println!("No marketplaces registered");
            }
            for marketplace in marketplaces {
                let tag = if marketplace.is_builtin {
                    " (built-in)".dimmed().to_string()
                } else {
                    String::new()
                };
                println!("{}{}", marketplace.name.bold(), tag);
            }
        }
    }

    Ok(())
}

fn handle_plugin(action: PluginAction, paths: WavePaths) -> Result<()> {
    let mut manager = create_manager(paths);

    match action {
        PluginAction::Install { plugin, scope } => {
            let (name, marketplace) = parse_plugin_key(&plugin)?;
            let record = manager.install_plugin(&name, &marketplace, scope)?;
            println!(
                "{} Successfully installed plugin: {} (version {}) in {} scope",
                "[OK]".green().bold(),
                plugin,
                record.version,
                scope
            );
        }
        PluginAction::Uninstall { plugin } => {
            let (name, marketplace) = parse_plugin_key(&plugin)?;
            let scope = manager.uninstall_plugin(&name, &marketplace)?;
            println!(
                "{} Successfully uninstalled plugin: {} from {} scope",
                "[OK]".green().bold(),
                plugin,
                scope
            );
        }
        PluginAction::Update { plugin } => {
            let (name, marketplace) = parse_plugin_key(&plugin)?;
            let record = manager.update_plugin(&name, &marketplace)?;
            println!(
                "{} Successfully updated plugin: {} to version {} in {} scope",
                "[OK]".green().bold(),
                plugin,
                record.version,
                record.scope
            );
        }
        PluginAction::Enable { plugin, scope } => {
            let (name, marketplace) = parse_plugin_key(&plugin)?;
            manager.enable_plugin(&name, &marketplace, scope)?;
            println!(
                "{} Successfully enabled plugin: {} in {} scope",
                "[OK]".green().bold(),
                plugin,
                scope
            );
        }
        PluginAction::Disable { plugin, scope } => {
            let (name, marketplace) = parse_plugin_key(&plugin)?;
            manager.disable_plugin(&name, &marketplace, scope)?;
            println!(
                "{} Successfully disabled plugin: {} in {} scope",
                "[OK]".green().bold(),
                plugin,
                scope
            );
        }
        PluginAction::List => {
            let catalog = manager.list_catalog()?;
            if catalog.is_empty() {
                println!("No plugins available");
            }
            for entry in catalog {
                let status = match (entry.installed, entry.enabled, entry.scope) {
                    (true, Some(true), Some(scope)) => {
                        format!(" [installed: {} scope, enabled]", scope).green().to_string()
                    }
                    (true, _, Some(scope)) => {
                        format!(" [installed: {} scope, disabled]", scope).yellow().to_string()
                    }
                    _ => String::new(),
                };
                let description = entry
                    .description
                    .as_deref()
                    .map(|d| format!(" - {}", d))
                    .unwrap_or_default();
                println!("{}{}{}", entry.key().bold(), status, description);
            }
        }
    }

    Ok(())
}

/// Split a `name@marketplace` identifier.
fn parse_plugin_key(key: &str) -> Result<(String, String)> {
    match key.split_once('@') {
        Some((name, marketplace)) if !name.is_empty() && !marketplace.is_empty() => {
            Ok((name.to_string(), marketplace.to_string()))
        }
        _ => Err(WaveError::InvalidPluginKey {
            key: key.to_string(),
        }),
    }
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    match shell {
        Shell::Bash => generate(clap_complete::shells::Bash, &mut cmd, name, &mut io::stdout()),
        Shell::Zsh => generate(clap_complete::shells::Zsh, &mut cmd, name, &mut io::stdout()),
        Shell::Fish => generate(clap_complete::shells::Fish, &mut cmd, name, &mut io::stdout()),
        Shell::PowerShell => generate(
            clap_complete::shells::PowerShell,
            &mut cmd,
            name,
            &mut io::stdout(),
        ),
        Shell::Elvish => generate(
            clap_complete::shells::Elvish,
            &mut cmd,
            name,
            &mut io::stdout(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plugin_key_splits_on_at() {
        let (name, marketplace) = parse_plugin_key("test-plugin@market").unwrap();
        assert_eq!(name, "test-plugin");
        assert_eq!(marketplace, "market");
    }

    #[test]
    fn parse_plugin_key_rejects_bare_name() {
        assert!(parse_plugin_key("test-plugin").is_err());
        assert!(parse_plugin_key("@market").is_err());
        assert!(parse_plugin_key("name@").is_err());
    }
}
