//! Command-line interface definition.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI entry point for the deployment engine.
#[derive(Parser, Debug)]
#[command(
    name = "dotdeploy",
    about = "Backup-safe, profile-driven dotfiles deployment",
    version = crate::VERSION
)]
pub struct Cli {
    /// Command to run (defaults to `install`)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every command
    #[command(flatten)]
    pub global: GlobalOpts,
}

impl Cli {
    /// The selected command, falling back to `install`.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Install)
    }
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Named profile (minimal, deploy, development, full)
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Explicit comma-separated component list (overrides --profile)
    #[arg(short, long, global = true, value_delimiter = ',')]
    pub components: Vec<String>,

    /// Choose a profile or components interactively (terminal only)
    #[arg(short, long, global = true)]
    pub interactive: bool,

    /// Print the available profiles and components, then exit
    #[arg(long, global = true)]
    pub list_profiles: bool,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Override the source tree root
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Override the target home directory
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Leave symlinks that do not point into the source tree alone
    #[arg(long, global = true)]
    pub strict: bool,

    /// Deploy tasks in parallel
    #[arg(long, global = true)]
    pub parallel: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Deploy the selected components (default)
    Install,
    /// Audit a deployment without changing anything
    Verify(VerifyOpts),
    /// Remove deployed symlinks and restore the newest backups
    Reset,
    /// Print version information
    Version,
}

/// Options for the `verify` subcommand.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyOpts {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
