//! [`AddonTree`] builder for loader test scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use addon_core::LoaderConfig;
use tempfile::TempDir;

/// A temporary deployment: an `addons/` directory plus room for state.
///
/// # Example
///
/// ```rust,no_run
/// use addon_test_utils::tree::AddonTree;
///
/// let tree = AddonTree::new();
/// tree.addon("base").data(&["data/base.xml"]).write();
/// tree.addon("sale").depends(&["base"]).write();
/// let config = tree.config();
/// ```
pub struct AddonTree {
    temp_dir: TempDir,
}

impl Default for AddonTree {
    fn default() -> Self {
        Self::new()
    }
}

impl AddonTree {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("addons")).unwrap();
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The single addons path of the tree.
    pub fn addons_path(&self) -> PathBuf {
        self.root().join("addons")
    }

    pub fn state_file(&self) -> PathBuf {
        self.root().join(".addons").join("state.toml")
    }

    /// Configuration for this tree.
    ///
    /// No server-wide modules and no external dependency probing, so tests
    /// control exactly what gets installed.
    pub fn config(&self) -> LoaderConfig {
        LoaderConfig {
            addons_paths: vec![self.addons_path()],
            state_file: self.state_file(),
            load_demo: false,
            server_wide_modules: Vec::new(),
            check_external_dependencies: false,
        }
    }

    /// Start describing an addon named `key`.
    pub fn addon(&self, key: &str) -> AddonBuilder<'_> {
        AddonBuilder {
            tree: self,
            key: key.to_string(),
            entries: vec![("name".to_string(), quote(key))],
            files: Vec::new(),
        }
    }

    /// Write `content` to `path`, relative to the addons path.
    pub fn write_file(&self, path: &str, content: &str) {
        let full_path = self.addons_path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full_path, content).unwrap();
    }

    /// Add a shell hook script `hooks/<name>` to an addon.
    pub fn hook_script(&self, key: &str, name: &str, script: &str) {
        self.write_file(&format!("{key}/hooks/{name}"), script);
    }

    /// Add a `models/<file>` contribution file to an addon.
    pub fn models_file(&self, key: &str, file: &str, content: &str) {
        self.write_file(&format!("{key}/models/{file}"), content);
    }

    /// Assert that `path` (relative to the tree root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }
}

/// Describes one addon; [`AddonBuilder::write`] puts it on disk as a
/// `__manifest__.py` descriptor.
pub struct AddonBuilder<'a> {
    tree: &'a AddonTree,
    key: String,
    entries: Vec<(String, String)>,
    files: Vec<(String, String)>,
}

impl AddonBuilder<'_> {
    fn entry(mut self, key: &str, literal: String) -> Self {
        self.entries.retain(|(k, _)| k != key);
        self.entries.push((key.to_string(), literal));
        self
    }

    pub fn version(self, version: &str) -> Self {
        self.entry("version", quote(version))
    }

    pub fn depends(self, depends: &[&str]) -> Self {
        self.entry("depends", list(depends))
    }

    pub fn excludes(self, excludes: &[&str]) -> Self {
        self.entry("excludes", list(excludes))
    }

    /// Data files, created with placeholder content.
    pub fn data(mut self, files: &[&str]) -> Self {
        for file in files {
            self.files.push((file.to_string(), placeholder(file)));
        }
        self.entry("data", list(files))
    }

    /// Data files listed in the descriptor but never created.
    pub fn missing_data(self, files: &[&str]) -> Self {
        self.entry("data", list(files))
    }

    pub fn demo(mut self, files: &[&str]) -> Self {
        for file in files {
            self.files.push((file.to_string(), placeholder(file)));
        }
        self.entry("demo", list(files))
    }

    pub fn installable(self, installable: bool) -> Self {
        self.entry("installable", boolean(installable))
    }

    pub fn application(self) -> Self {
        self.entry("application", boolean(true))
    }

    /// `auto_install = True`: triggered by every dependency.
    pub fn auto_install(self) -> Self {
        self.entry("auto_install", boolean(true))
    }

    /// `auto_install = [...]`: triggered by the listed modules.
    pub fn auto_install_on(self, triggers: &[&str]) -> Self {
        self.entry("auto_install", list(triggers))
    }

    pub fn pre_init_hook(self, name: &str) -> Self {
        self.entry("pre_init_hook", quote(name))
    }

    pub fn post_init_hook(self, name: &str) -> Self {
        self.entry("post_init_hook", quote(name))
    }

    pub fn uninstall_hook(self, name: &str) -> Self {
        self.entry("uninstall_hook", quote(name))
    }

    pub fn external_bin(self, binaries: &[&str]) -> Self {
        self.entry("external_dependencies", format!("{{'bin': {}}}", list(binaries)))
    }

    /// Write the descriptor and every data file; returns the addon directory.
    pub fn write(self) -> PathBuf {
        let dir = self.tree.addons_path().join(&self.key);
        fs::create_dir_all(&dir).unwrap();

        let mut descriptor = String::from("# -*- coding: utf-8 -*-\n{\n");
        for (key, literal) in &self.entries {
            descriptor.push_str(&format!("    '{key}': {literal},\n"));
        }
        descriptor.push_str("}\n");
        fs::write(dir.join("__manifest__.py"), descriptor).unwrap();

        for (path, content) in &self.files {
            let full_path = dir.join(path);
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(full_path, content).unwrap();
        }
        dir
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn list(values: &[&str]) -> String {
    let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("[{}]", items.join(", "))
}

fn boolean(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

fn placeholder(file: &str) -> String {
    match Path::new(file).extension().and_then(|e| e.to_str()) {
        Some("xml") => "<?xml version=\"1.0\"?>\n<odoo/>\n".to_string(),
        Some("csv") => "id,name\n".to_string(),
        Some("json") => "[]\n".to_string(),
        _ => String::new(),
    }
}
