//! Workspace discovery and service construction for CLI commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::clock::{Clock, FixedClock, SystemClock};
use crate::core::config::{Config, CONFIG_FILE, WORKSPACE_DIR};
use crate::core::error::TemporalError;
use crate::core::identity::TenantId;
use crate::core::service::{RequestContext, TemporalService};

/// A directory containing `.epochal/config.yaml`
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    config: Config,
}

impl Workspace {
    /// Walk up from `start` to the nearest directory holding a workspace
    pub fn discover_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| dir.join(WORKSPACE_DIR).join(CONFIG_FILE).is_file())
            .map(Path::to_path_buf)
    }

    /// Load the workspace rooted at `root`
    pub fn load(root: &Path) -> std::result::Result<Self, TemporalError> {
        let config = Config::load(&Self::config_path(root))?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    /// Find and load the workspace for this invocation, if there is one
    pub fn locate(global: &GlobalOpts) -> std::result::Result<Option<Self>, TemporalError> {
        let root = match &global.workspace {
            Some(dir) => Some(dir.clone()),
            None => Self::discover_from(&std::env::current_dir()?),
        };
        root.map(|r| Self::load(&r)).transpose()
    }

    pub fn config_path(root: &Path) -> PathBuf {
        root.join(WORKSPACE_DIR).join(CONFIG_FILE)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Map a library error to a diagnostic prefixed with its code
pub fn diag(err: TemporalError) -> miette::Report {
    miette::miette!("[{}] {}", err.code(), err)
}

/// Open the service and build the request context for a command
pub fn open(global: &GlobalOpts) -> Result<(TemporalService, RequestContext)> {
    let workspace = Workspace::locate(global).map_err(diag)?;

    let (config, db_path) = match (&global.db, &workspace) {
        (Some(db), ws) => (
            ws.as_ref().map(|w| w.config().clone()).unwrap_or_default(),
            db.clone(),
        ),
        (None, Some(ws)) => (ws.config().clone(), ws.config().database_path(ws.root())),
        (None, None) => {
            return Err(miette::miette!(
                "not inside an epochal workspace (run `epochal init` or pass --db)"
            ))
        }
    };

    let tenant_raw = global
        .tenant
        .clone()
        .unwrap_or_else(|| config.default_tenant.clone());
    let tenant: TenantId = tenant_raw
        .parse()
        .map_err(|e| diag(TemporalError::from(e)))?;

    let clock: Arc<dyn Clock> = match global.today {
        Some(date) => Arc::new(FixedClock::on(date)),
        None => Arc::new(SystemClock),
    };

    let service = TemporalService::open_path(&db_path, config)
        .map_err(diag)?
        .with_clock(clock);
    Ok((service, RequestContext::new(tenant)))
}
