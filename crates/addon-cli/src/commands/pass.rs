//! Install, upgrade and remove commands

use addon_core::{LoadReport, Loader, Request};
use colored::Colorize;

use crate::error::{CliError, Result};

/// Run a state-changing load pass and print what it did.
///
/// Aborted transitions take precedence over blocked modules when choosing
/// the error.
pub fn run_pass(loader: &Loader, request: &Request) -> Result<()> {
    let report = loader.run(request)?;
    print_report(&report);
    outcome(&report)
}

fn print_report(report: &LoadReport) {
    for warning in &report.warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }

    for key in &report.installed {
        let note = if report.auto_installed.contains(key) {
            " (auto-install)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("  {} {}{}", "+".green(), key.cyan(), note);
    }
    for key in &report.upgraded {
        println!("  {} {}", "~".yellow(), key.cyan());
    }
    for key in &report.removed {
        println!("  {} {}", "-".red(), key.cyan());
    }
    for aborted in &report.aborted {
        println!("  {} {}: {}", "x".red().bold(), aborted.module.cyan(), aborted.cause);
    }
    for key in &report.blocked {
        let reason = report
            .excluded
            .get(key)
            .map(ToString::to_string)
            .unwrap_or_else(|| "not loadable".to_string());
        println!("  {} {}: {}", "!".red(), key.cyan(), reason);
    }

    println!();
    if report.is_clean() {
        println!(
            "{} {} modules loaded.",
            "OK".green().bold(),
            report.loaded.len()
        );
    } else {
        println!(
            "{} {} modules loaded, {} aborted, {} blocked.",
            "Incomplete:".yellow().bold(),
            report.loaded.len(),
            report.aborted.len(),
            report.blocked.len()
        );
    }
}

fn outcome(report: &LoadReport) -> Result<()> {
    if !report.aborted.is_empty() {
        return Err(CliError::Aborted(
            report.aborted.iter().map(|a| a.module.clone()).collect(),
        ));
    }
    if !report.blocked.is_empty() {
        return Err(CliError::Blocked(report.blocked.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use addon_core::{AbortCause, Aborted};

    #[test]
    fn clean_report_succeeds() {
        let report = LoadReport {
            loaded: vec!["base".to_string()],
            installed: vec!["base".to_string()],
            ..Default::default()
        };
        assert!(outcome(&report).is_ok());
    }

    #[test]
    fn aborted_wins_over_blocked() {
        let report = LoadReport {
            blocked: vec!["b".to_string()],
            aborted: vec![Aborted {
                module: "a".to_string(),
                cause: AbortCause::Purge {
                    message: "locked".to_string(),
                },
            }],
            ..Default::default()
        };
        let err = outcome(&report).unwrap_err();
        assert!(matches!(err, CliError::Aborted(ref keys) if keys == &["a".to_string()]));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn blocked_fails_with_code_two() {
        let report = LoadReport {
            blocked: vec!["b".to_string()],
            ..Default::default()
        };
        assert_eq!(outcome(&report).unwrap_err().exit_code(), 2);
    }
}
