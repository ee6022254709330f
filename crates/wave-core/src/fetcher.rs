//! Source fetcher
//!
//! Brings marketplace source content onto the local filesystem and copies
//! plugin subtrees into scope plugin directories. Fetching is a capability
//! seam: the manager talks to the `SourceFetcher` trait, and tests swap in
//! directory-backed sources without touching git.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::{Result, WaveError};
use crate::types::{
    MarketplaceManifest, PluginDescriptor, SourceDescriptor, MARKETPLACE_MANIFEST_FILE,
};

/// Default deadline for a single git invocation. A hung fetch is killed
/// and reported instead of blocking the caller indefinitely.
pub const GIT_TIMEOUT: Duration = Duration::from_secs(120);

pub trait SourceFetcher {
    /// Materialize a marketplace source locally and return its root.
    ///
    /// Directory sources are used in place; git sources are shallow-cloned
    /// into the fetcher's cache. With `refresh` an existing clone is
    /// discarded and fetched again.
    fn sync_source(&self, name: &str, source: &SourceDescriptor, refresh: bool)
        -> Result<PathBuf>;

    /// Fetch and parse the marketplace manifest from a source.
    fn fetch_manifest(
        &self,
        name: &str,
        source: &SourceDescriptor,
        refresh: bool,
    ) -> Result<MarketplaceManifest> {
        let root = self.sync_source(name, source, refresh)?;
        read_manifest(name, &root)
    }

    /// Copy a plugin subtree from a synced source root into `target_dir`.
    fn materialize_plugin(
        &self,
        source_root: &Path,
        descriptor: &PluginDescriptor,
        target_dir: &Path,
    ) -> Result<()>;

    /// Drop any cached content for a source.
    fn evict(&self, name: &str) -> Result<()>;
}

/// Production fetcher: local directories in place, git over a subprocess.
pub struct GitDirFetcher {
    /// Cache directory for git clones
    cache_dir: PathBuf,
    /// Deadline per git invocation
    git_timeout: Duration,
}

impl GitDirFetcher {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            git_timeout: GIT_TIMEOUT,
        }
    }

    pub fn with_timeout(cache_dir: PathBuf, git_timeout: Duration) -> Self {
        Self {
            cache_dir,
            git_timeout,
        }
    }

    fn clone_dir(&self, name: &str) -> PathBuf {
        self.cache_dir.join(name)
    }

    /// Run `git clone --depth 1` under the configured deadline.
    fn git_clone(&self, url: &str, r#ref: Option<&str>, target: &Path) -> Result<()> {
        fs::create_dir_all(target.parent().unwrap_or(target))?;

        let mut args = vec!["clone", "--depth", "1"];
        if let Some(git_ref) = r#ref {
            args.push("--branch");
            args.push(git_ref);
        }
        args.push(url);

        let mut child = Command::new("git")
            .args(&args)
            .arg(target)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let deadline = Instant::now() + self.git_timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(WaveError::Git(format!(
                    "git clone timed out after {}s: {}",
                    self.git_timeout.as_secs(),
                    url
                )));
            }
            std::thread::sleep(Duration::from_millis(50));
        };

        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            return Err(WaveError::Git(format!(
                "git clone failed: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl SourceFetcher for GitDirFetcher {
    fn sync_source(
        &self,
        name: &str,
        source: &SourceDescriptor,
        refresh: bool,
    ) -> Result<PathBuf> {
        match source {
            SourceDescriptor::Directory { path } => {
                let root = PathBuf::from(path);
                if !root.is_dir() {
                    return Err(WaveError::ManifestFetch {
                        name: name.to_string(),
                        message: format!("directory does not exist: {}", root.display()),
                    });
                }
                Ok(root)
            }
            SourceDescriptor::Git { url, r#ref } => {
                let target = self.clone_dir(name);
                if target.exists() {
                    if !refresh {
                        return Ok(target);
                    }
                    fs::remove_dir_all(&target)?;
                }
                self.git_clone(url, r#ref.as_deref(), &target)
                    .map_err(|e| WaveError::ManifestFetch {
                        name: name.to_string(),
                        message: e.to_string(),
                    })?;
                Ok(target)
            }
        }
    }

    fn materialize_plugin(
        &self,
        source_root: &Path,
        descriptor: &PluginDescriptor,
        target_dir: &Path,
    ) -> Result<()> {
        let plugin_src = source_root.join(descriptor.source.trim_start_matches("./"));

        if !plugin_src.is_dir() {
            return Err(WaveError::Install {
                key: descriptor.key(),
                message: format!("plugin source missing: {}", plugin_src.display()),
            });
        }

        // Path traversal protection: the locator must stay inside the
        // marketplace source root.
        let canonical_src = plugin_src.canonicalize()?;
        let canonical_root = source_root.canonicalize()?;
        if !canonical_src.starts_with(&canonical_root) {
            return Err(WaveError::Install {
                key: descriptor.key(),
                message: format!(
                    "plugin source escapes marketplace root: {}",
                    descriptor.source
                ),
            });
        }

        if target_dir.exists() {
            fs::remove_dir_all(target_dir)?;
        }
        copy_dir_recursive(&canonical_src, target_dir)?;

        Ok(())
    }

    fn evict(&self, name: &str) -> Result<()> {
        let target = self.clone_dir(name);
        if target.exists() {
            fs::remove_dir_all(&target)?;
        }
        Ok(())
    }
}

/// Parse the marketplace manifest under a synced source root.
pub fn read_manifest(name: &str, source_root: &Path) -> Result<MarketplaceManifest> {
    let path = source_root.join(MARKETPLACE_MANIFEST_FILE);

    if !path.exists() {
        return Err(WaveError::ManifestFetch {
            name: name.to_string(),
            message: format!("manifest not found: {}", path.display()),
        });
    }

    let content = fs::read_to_string(&path)?;
    serde_json::from_str(&content).map_err(|e| WaveError::ManifestFetch {
        name: name.to_string(),
        message: e.to_string(),
    })
}

/// Copy a directory tree, skipping `.git`.
fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            if entry.file_name() == ".git" {
                continue;
            }
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_fetcher() -> (GitDirFetcher, TempDir) {
        let temp = TempDir::new().unwrap();
        let fetcher = GitDirFetcher::new(temp.path().join("cache"));
        (fetcher, temp)
    }

    fn create_source_dir(temp: &TempDir) -> PathBuf {
        let root = temp.path().join("market-src");
        fs::create_dir_all(root.join(".wave-plugin")).unwrap();
        fs::write(
            root.join(MARKETPLACE_MANIFEST_FILE),
            r#"{
                "name": "market",
                "plugins": [
                    {
                        "name": "test-plugin",
                        "source": "./plugins/test-plugin",
                        "version": "1.0.0"
                    }
                ]
            }"#,
        )
        .unwrap();
        fs::create_dir_all(root.join("plugins/test-plugin")).unwrap();
        fs::write(root.join("plugins/test-plugin/plugin.md"), "# test").unwrap();
        root
    }

    fn directory_source(root: &Path) -> SourceDescriptor {
        SourceDescriptor::Directory {
            path: root.to_string_lossy().to_string(),
        }
    }

    #[test]
    fn sync_directory_source_in_place() {
        let (fetcher, temp) = create_test_fetcher();
        let root = create_source_dir(&temp);

        let synced = fetcher
            .sync_source("market", &directory_source(&root), false)
            .unwrap();
        assert_eq!(synced, root);
    }

    #[test]
    fn sync_missing_directory_is_manifest_fetch_error() {
        let (fetcher, temp) = create_test_fetcher();
        let source = directory_source(&temp.path().join("nope"));

        let err = fetcher.sync_source("market", &source, false).unwrap_err();
        assert!(matches!(err, WaveError::ManifestFetch { .. }));
    }

    #[test]
    fn fetch_manifest_from_directory() {
        let (fetcher, temp) = create_test_fetcher();
        let root = create_source_dir(&temp);

        let manifest = fetcher
            .fetch_manifest("market", &directory_source(&root), false)
            .unwrap();
        assert_eq!(manifest.name, "market");
        assert_eq!(manifest.plugins.len(), 1);
    }

    #[test]
    fn fetch_manifest_missing_file() {
        let (fetcher, temp) = create_test_fetcher();
        let root = temp.path().join("empty");
        fs::create_dir_all(&root).unwrap();

        let err = fetcher
            .fetch_manifest("market", &directory_source(&root), false)
            .unwrap_err();
        assert!(matches!(err, WaveError::ManifestFetch { .. }));
    }

    #[test]
    fn materialize_copies_plugin_subtree() {
        let (fetcher, temp) = create_test_fetcher();
        let root = create_source_dir(&temp);
        let descriptor = PluginDescriptor {
            name: "test-plugin".to_string(),
            marketplace: "market".to_string(),
            source: "./plugins/test-plugin".to_string(),
            description: None,
            version: Some("1.0.0".to_string()),
        };

        let target = temp.path().join("installed/test-plugin");
        fetcher
            .materialize_plugin(&root, &descriptor, &target)
            .unwrap();

        assert!(target.join("plugin.md").exists());
    }

    #[test]
    fn materialize_rejects_traversal() {
        let (fetcher, temp) = create_test_fetcher();
        let root = create_source_dir(&temp);
        fs::create_dir_all(temp.path().join("outside")).unwrap();

        let descriptor = PluginDescriptor {
            name: "evil".to_string(),
            marketplace: "market".to_string(),
            source: "../outside".to_string(),
            description: None,
            version: None,
        };

        let target = temp.path().join("installed/evil");
        let err = fetcher
            .materialize_plugin(&root, &descriptor, &target)
            .unwrap_err();
        assert!(matches!(err, WaveError::Install { .. }));
        assert!(!target.exists());
    }

    #[test]
    fn copy_skips_git_dir() {
        let (_fetcher, temp) = create_test_fetcher();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join(".git")).unwrap();
        fs::write(src.join(".git/config"), "git config").unwrap();
        fs::write(src.join("file.txt"), "content").unwrap();

        let dst = temp.path().join("dst");
        copy_dir_recursive(&src, &dst).unwrap();

        assert!(!dst.join(".git").exists());
        assert!(dst.join("file.txt").exists());
    }
}
