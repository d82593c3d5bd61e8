//! Scanning addons paths for addon directories.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::manifest::{Manifest, find_descriptor};

/// Result of scanning a set of addons paths.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Readable manifests by technical key.
    pub manifests: BTreeMap<String, Manifest>,
    /// Addon directories whose descriptor could not be read.
    pub failures: Vec<DiscoveryFailure>,
    pub warnings: Vec<DiscoveryWarning>,
}

impl Discovery {
    pub fn get(&self, key: &str) -> Option<&Manifest> {
        self.manifests.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.manifests.contains_key(key)
    }

    pub fn is_failed(&self, key: &str) -> bool {
        self.failures.iter().any(|f| f.key == key)
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}

#[derive(Debug)]
pub struct DiscoveryFailure {
    pub key: String,
    pub path: PathBuf,
    pub error: Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryWarning {
    /// An addon with the same key was already found on an earlier path.
    Shadowed {
        key: String,
        kept: PathBuf,
        ignored: PathBuf,
    },
}

impl fmt::Display for DiscoveryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shadowed { key, kept, ignored } => write!(
                f,
                "addon '{key}' at {} is shadowed by {}",
                ignored.display(),
                kept.display()
            ),
        }
    }
}

/// Scan `addons_paths` in order.
///
/// Every direct subdirectory holding a descriptor is an addon. The first path
/// providing a key wins. A path that does not exist fails the whole scan;
/// a single unreadable addon does not.
pub fn discover(addons_paths: &[PathBuf]) -> Result<Discovery> {
    let mut discovery = Discovery::default();
    let mut seen: BTreeMap<String, PathBuf> = BTreeMap::new();

    for addons_path in addons_paths {
        if !addons_path.is_dir() {
            return Err(Error::AddonsPathNotFound(addons_path.clone()));
        }
        let root = dunce::canonicalize(addons_path).map_err(|e| Error::io(addons_path, e))?;

        for dir in addon_dirs(&root)? {
            let key = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            if let Some(kept) = seen.get(&key) {
                let warning = DiscoveryWarning::Shadowed {
                    key: key.clone(),
                    kept: kept.clone(),
                    ignored: dir.clone(),
                };
                tracing::warn!("{}", warning);
                discovery.warnings.push(warning);
                continue;
            }
            seen.insert(key.clone(), dir.clone());

            match Manifest::read(&dir) {
                Ok(manifest) => {
                    tracing::debug!(module = %key, path = %dir.display(), "Discovered addon");
                    discovery.manifests.insert(key, manifest);
                }
                Err(error) => {
                    tracing::warn!(module = %key, "Skipping addon: {}", error);
                    discovery.failures.push(DiscoveryFailure {
                        key,
                        path: dir,
                        error,
                    });
                }
            }
        }
    }

    discovery.failures.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(discovery)
}

/// Subdirectories of `root` holding a descriptor, sorted by name.
fn addon_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(root).map_err(|e| Error::io(root, e))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(root, e))?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !path.is_dir() || find_descriptor(&path).is_none() {
            continue;
        }
        dirs.push(path);
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn addon(root: &Path, key: &str, descriptor: &str) {
        let dir = root.join(key);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("__manifest__.py"), descriptor).unwrap();
    }

    #[test]
    fn finds_addons_sorted_by_key() {
        let temp = TempDir::new().unwrap();
        addon(temp.path(), "sale", "{'depends': ['base']}");
        addon(temp.path(), "base", "{}");
        fs::create_dir(temp.path().join("not_an_addon")).unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();

        let discovery = discover(&[temp.path().to_path_buf()]).unwrap();
        let keys: Vec<_> = discovery.manifests.keys().cloned().collect();
        assert_eq!(keys, vec!["base", "sale"]);
        assert!(discovery.failures.is_empty());
    }

    #[test]
    fn first_path_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        addon(first.path(), "web", "{'version': '2.0'}");
        addon(second.path(), "web", "{'version': '1.0'}");

        let discovery =
            discover(&[first.path().to_path_buf(), second.path().to_path_buf()]).unwrap();
        assert_eq!(discovery.get("web").unwrap().version, "2.0");
        assert!(matches!(
            &discovery.warnings[..],
            [DiscoveryWarning::Shadowed { key, .. }] if key == "web"
        ));
    }

    #[test]
    fn unreadable_addon_is_collected() {
        let temp = TempDir::new().unwrap();
        addon(temp.path(), "good", "{}");
        addon(temp.path(), "bad", "{'depends': [}");

        let discovery = discover(&[temp.path().to_path_buf()]).unwrap();
        assert!(discovery.contains("good"));
        assert!(discovery.is_failed("bad"));
        assert!(matches!(
            discovery.failures[0].error,
            Error::MalformedManifest { .. }
        ));
    }

    #[test]
    fn missing_addons_path_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = discover(&[temp.path().join("nope")]).unwrap_err();
        assert!(matches!(err, Error::AddonsPathNotFound(_)));
    }
}
