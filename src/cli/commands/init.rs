//! `epochal init` command - create a workspace

use std::fs;
use std::path::PathBuf;

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::workspace::{diag, Workspace};
use crate::core::clock::ReferenceZone;
use crate::core::config::{Config, WORKSPACE_DIR};
use crate::core::identity::TenantId;
use crate::core::store::Store;

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    pub path: Option<PathBuf>,

    /// Tenant used when --tenant is not given
    #[arg(long = "default-tenant")]
    pub default_tenant: Option<String>,

    /// Zone that decides "today" (UTC or ±HH:MM)
    #[arg(long, allow_hyphen_values = true)]
    pub zone: Option<ReferenceZone>,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let root = match args.path {
        Some(p) => p,
        None => std::env::current_dir().into_diagnostic()?,
    };
    let config_path = Workspace::config_path(&root);

    if config_path.exists() && !args.force {
        return Err(miette::miette!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        ));
    }

    let mut config = Config::default();
    if let Some(tenant) = args.default_tenant {
        let tenant = tenant.parse::<TenantId>().map_err(|e| diag(e.into()))?;
        config.default_tenant = tenant.to_string();
    }
    if let Some(zone) = args.zone {
        config.timeline.reference_zone = zone;
    }

    fs::create_dir_all(root.join(WORKSPACE_DIR)).into_diagnostic()?;
    fs::write(&config_path, config.to_yaml().map_err(diag)?).into_diagnostic()?;

    let db_path = config.database_path(&root);
    Store::open(&db_path, config.lock_timeout()).map_err(diag)?;

    println!(
        "{} Initialized epochal workspace in {}",
        style("✓").green(),
        style(root.display()).cyan()
    );
    println!("   {}", style(config_path.display()).dim());
    println!("   {}", style(db_path.display()).dim());
    Ok(())
}
