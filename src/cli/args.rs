//! Command-line argument definitions

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::cli::commands::completions::CompletionsArgs;
use crate::cli::commands::family::FamilyCommands;
use crate::cli::commands::init::InitArgs;

/// Temporally versioned organization units, job catalog and positions
#[derive(Parser, Debug)]
#[command(name = "epochal", version, about, propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options accepted by every subcommand
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Tenant to operate on (defaults to `default_tenant` from the config)
    #[arg(long, short = 't', global = true, env = "EPOCHAL_TENANT")]
    pub tenant: Option<String>,

    /// Database file, overriding the workspace config
    #[arg(long, global = true, env = "EPOCHAL_DB")]
    pub db: Option<PathBuf>,

    /// Workspace directory (searched upward from the current directory if absent)
    #[arg(long, short = 'C', global = true)]
    pub workspace: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Auto)]
    pub format: OutputFormat,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, global = true, hide = true, env = "EPOCHAL_TODAY")]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table for lists, YAML for single records
    Auto,
    Table,
    Yaml,
    Json,
    Csv,
    /// Record ids only, one per line
    Id,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a workspace (.epochal/config.yaml and the database)
    Init(InitArgs),

    /// Organization units
    #[command(subcommand)]
    Org(FamilyCommands),

    /// Job family groups
    #[command(subcommand)]
    Group(FamilyCommands),

    /// Job families
    #[command(subcommand)]
    Family(FamilyCommands),

    /// Job roles
    #[command(subcommand)]
    Role(FamilyCommands),

    /// Job levels
    #[command(subcommand)]
    Level(FamilyCommands),

    /// Positions
    #[command(subcommand, name = "pos", alias = "position")]
    Pos(FamilyCommands),

    /// Print a shell completion script
    Completions(CompletionsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "epochal", "org", "show", "HQ", "--tenant", "acme", "-vv", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.global.tenant.as_deref(), Some("acme"));
        assert_eq!(cli.global.verbose, 2);
        assert_eq!(cli.global.format, OutputFormat::Json);
    }
}
