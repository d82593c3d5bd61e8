//! List command

use addon_core::{Loader, ModuleState, ModuleStatus};
use colored::{ColoredString, Colorize};

use crate::error::Result;

/// Run the list command
pub fn run_list(loader: &Loader, json: bool) -> Result<()> {
    let rows = loader.status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{}", "Modules".bold());
    println!();

    if rows.is_empty() {
        println!(
            "  {} (check {} or {})",
            "None found".dimmed(),
            "--addons-path".cyan(),
            "addons.toml".cyan()
        );
        return Ok(());
    }

    for row in &rows {
        println!(
            "  {:<24} {:<14} {:<12} {}",
            row.key.green(),
            state_label(row.state),
            version_label(row),
            notes(row).dimmed()
        );
    }

    let installed = rows.iter().filter(|r| r.state.is_installed()).count();
    println!();
    println!(
        "{} {} modules, {} installed. Use {} to add one.",
        "Total:".dimmed(),
        rows.len(),
        installed,
        "addons install <module>".cyan()
    );

    Ok(())
}

fn state_label(state: ModuleState) -> ColoredString {
    match state {
        ModuleState::Installed => state.as_str().green(),
        ModuleState::Uninstalled => state.as_str().normal(),
        ModuleState::Uninstallable => state.as_str().dimmed(),
        ModuleState::ToInstall | ModuleState::ToUpgrade | ModuleState::ToRemove => state.as_str().yellow(),
    }
}

/// Descriptor version, with the applied one when they differ.
fn version_label(row: &ModuleStatus) -> String {
    match (&row.version, &row.installed_version) {
        (Some(version), Some(installed)) if version != installed => format!("{installed} -> {version}"),
        (Some(version), _) => version.clone(),
        (None, Some(installed)) => installed.clone(),
        (None, None) => "-".to_string(),
    }
}

fn notes(row: &ModuleStatus) -> String {
    let mut notes = Vec::new();
    if row.application {
        notes.push("application".to_string());
    }
    if row.auto_install {
        notes.push("auto-install".to_string());
    }
    if row.checksum_drift {
        notes.push("descriptor changed, upgrade pending".to_string());
    }
    if row.path.is_none() {
        notes.push("not found in addons paths".to_string());
    }
    if let Some(error) = &row.error {
        notes.push(format!("unreadable: {error}"));
    }
    notes.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn row() -> ModuleStatus {
        ModuleStatus {
            key: "sale".to_string(),
            name: Some("Sales".to_string()),
            version: Some("1.1".to_string()),
            state: ModuleState::Installed,
            installed_version: Some("1.0".to_string()),
            application: true,
            auto_install: false,
            checksum_drift: true,
            path: Some(PathBuf::from("addons/sale")),
            error: None,
        }
    }

    #[test]
    fn version_shows_pending_upgrade() {
        assert_eq!(version_label(&row()), "1.0 -> 1.1");

        let mut current = row();
        current.installed_version = Some("1.1".to_string());
        assert_eq!(version_label(&current), "1.1");
    }

    #[test]
    fn notes_list_flags() {
        assert_eq!(notes(&row()), "application, descriptor changed, upgrade pending");

        let mut gone = row();
        gone.application = false;
        gone.checksum_drift = false;
        gone.path = None;
        assert_eq!(notes(&gone), "not found in addons paths");
    }
}
