//! Probing `external_dependencies` before an install
//!
//! Misses are advisory: the loader reports them and installs anyway.

use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use addon_manifest::ExternalDependencies;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum MissingExternal {
    Binary(String),
    PythonPackage(String),
}

impl fmt::Display for MissingExternal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary(name) => write!(f, "executable '{name}' not found on PATH"),
            Self::PythonPackage(name) => write!(f, "python package '{name}' is not importable"),
        }
    }
}

/// Every declared requirement that is not met on this host.
pub fn probe(deps: &ExternalDependencies) -> Vec<MissingExternal> {
    let mut missing = Vec::new();
    for tool in &deps.bin {
        if find_binary(tool).is_none() {
            missing.push(MissingExternal::Binary(tool.clone()));
        }
    }
    for package in &deps.python {
        if !python_package_available(package) {
            missing.push(MissingExternal::PythonPackage(package.clone()));
        }
    }
    missing
}

/// Locate `tool` in the `PATH` directories.
pub fn find_binary(tool: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH").unwrap_or_default();
    let extensions: Vec<String> = if cfg!(windows) {
        std::env::var("PATHEXT")
            .unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string())
            .split(';')
            .map(|s| s.to_ascii_lowercase())
            .collect()
    } else {
        vec![String::new()]
    };

    for dir in std::env::split_paths(&path_var) {
        for ext in &extensions {
            let candidate = dir.join(format!("{tool}{ext}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Whether `python3 -c "import <package>"` succeeds.
///
/// Names that are not dotted identifiers are never importable.
pub fn python_package_available(package: &str) -> bool {
    let valid = !package.is_empty()
        && package
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    if !valid {
        return false;
    }
    Command::new("python3")
        .arg("-c")
        .arg(format!("import {package}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}
