//! Addon loader CLI
//!
//! Installs, upgrades and removes addons, and shows what the loaded modules
//! compose into.

mod cli;
mod commands;
mod error;
mod logging;

use std::io;
use std::path::Path;

use addon_core::{ConfigResolver, Loader, LoaderConfig, Request};
use clap::{CommandFactory, Parser};
use colored::Colorize;

use cli::{Cli, Commands, GlobalArgs};
use error::{CliError, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.global.verbose) {
        eprintln!("{} {}", "warning:".yellow().bold(), e);
    }
    tracing::debug!("Verbose mode enabled");

    execute_command(cli)
}

fn execute_command(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "addons", &mut io::stdout());
        return Ok(());
    }

    let cwd = std::env::current_dir()?;
    let loader = Loader::new(load_config(&cwd, &cli.global)?);

    match cli.command {
        Commands::List { json } => commands::run_list(&loader, json),
        Commands::Install { modules } => commands::run_pass(&loader, &Request::Install(modules)),
        Commands::Upgrade { modules } => commands::run_pass(&loader, &Request::Upgrade(modules)),
        Commands::Remove { modules, cascade } => commands::run_pass(
            &loader,
            &Request::Remove {
                keys: modules,
                cascade,
            },
        ),
        Commands::Inspect { model, json } => commands::run_inspect(&loader, &model, json),
        Commands::Completions { .. } => Ok(()),
    }
}

/// Config files and environment first, then command-line flags.
fn load_config(cwd: &Path, global: &GlobalArgs) -> Result<LoaderConfig> {
    let mut resolver = ConfigResolver::new(cwd);
    if let Some(path) = &global.config {
        resolver = resolver.with_config_file(absolute(cwd, path));
    }
    let mut config = resolver.resolve()?;

    if !global.addons_paths.is_empty() {
        config.addons_paths = global.addons_paths.iter().map(|p| absolute(cwd, p)).collect();
    }
    if let Some(state) = &global.state {
        config.state_file = absolute(cwd, state);
    }
    if global.demo {
        config.load_demo = true;
    }

    if config.addons_paths.is_empty() {
        return Err(CliError::user(
            "No addons paths configured. Pass --addons-path or set addons_paths in addons.toml",
        ));
    }
    tracing::debug!(?config, "Resolved loader config");
    Ok(config)
}

fn absolute(cwd: &Path, path: &Path) -> std::path::PathBuf {
    if path.is_relative() {
        cwd.join(path)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn flags_override_config_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("addons.toml"),
            "addons_paths = [\"from-file\"]\nload_demo = false\n",
        )
        .unwrap();

        let global = GlobalArgs {
            addons_paths: vec![PathBuf::from("from-flag")],
            state: Some(PathBuf::from("var/state.toml")),
            demo: true,
            ..Default::default()
        };
        let config = load_config(temp.path(), &global).unwrap();

        assert_eq!(config.addons_paths, vec![temp.path().join("from-flag")]);
        assert_eq!(config.state_file, temp.path().join("var/state.toml"));
        assert!(config.load_demo);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let global = GlobalArgs {
            config: Some(PathBuf::from("nope.toml")),
            ..Default::default()
        };
        assert!(load_config(temp.path(), &global).is_err());
    }
}
