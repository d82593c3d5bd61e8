//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Addon loader - install, upgrade and remove ERP addons
#[derive(Parser, Debug)]
#[command(name = "addons")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every command
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: ./addons.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding addons; repeat for several, earlier wins
    #[arg(long = "addons-path", global = true, value_name = "DIR")]
    pub addons_paths: Vec<PathBuf>,

    /// Module state file
    #[arg(long, global = true, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Load demo data on install and upgrade
    #[arg(long, global = true)]
    pub demo: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List discovered modules with their state
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Install modules and their dependencies
    Install {
        /// Technical keys
        #[arg(required = true)]
        modules: Vec<String>,
    },

    /// Re-apply modules and the installed modules depending on them
    Upgrade {
        /// Technical keys
        #[arg(required = true)]
        modules: Vec<String>,
    },

    /// Remove installed modules
    Remove {
        /// Technical keys
        #[arg(required = true)]
        modules: Vec<String>,

        /// Also remove installed modules that depend on them
        #[arg(long)]
        cascade: bool,
    },

    /// Show the composed fields and method chains of a model
    Inspect {
        /// Model key, e.g. res.partner
        model: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    ///
    /// Examples:
    ///   addons completions bash > ~/.local/share/bash-completion/completions/addons
    ///   addons completions zsh > ~/.zfunc/_addons
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
