use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;

use crate::runtime::Runtime;
use crate::upstream::DEFAULT_REGISTRY_URL;

/// Environment variable holding the bearer token sent to the upstream.
pub const UPSTREAM_TOKEN_ENV: &str = "PKGMIRROR_UPSTREAM_TOKEN";

/// Values given on the command line (or their `env` fallbacks).
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root: Option<PathBuf>,
    pub registry: Option<String>,
    pub sync_by_install: bool,
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Store root; documents live under `<root>/packages`.
    pub root: PathBuf,
    pub registry_url: String,
    pub token: Option<String>,
    /// Sync unknown unscoped packages when they are read.
    pub sync_by_install: bool,
}

impl Config {
    pub fn load<R: Runtime>(runtime: &R, overrides: ConfigOverrides) -> Result<Self> {
        let root = match overrides.root {
            Some(path) => path,
            None => default_root(runtime)?,
        };
        debug!("Using store root: {:?}", root);

        let token = runtime
            .env_var(UPSTREAM_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty());
        if token.is_some() {
            debug!("Using {} for upstream authentication", UPSTREAM_TOKEN_ENV);
        }

        Ok(Self {
            root,
            registry_url: overrides
                .registry
                .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string()),
            token,
            sync_by_install: overrides.sync_by_install,
        })
    }
}

/// Returns: `<home>/.pkgmirror`
#[tracing::instrument(skip(runtime))]
pub fn default_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let home_dir = runtime
        .home_dir()
        .context("Could not find home directory")?;
    Ok(home_dir.join(".pkgmirror"))
}
