use anyhow::Result;
use log::warn;
use std::io::Write;

use crate::service::RegistryService;
use crate::sync::SyncOptions;

/// Sync a package from upstream now and print the report.
#[tracing::instrument(skip(service, out))]
pub async fn sync<W: Write>(
    service: &RegistryService,
    name: &str,
    no_dep: bool,
    out: &mut W,
) -> Result<()> {
    let options = SyncOptions {
        recurse_dependencies: !no_dep,
    };
    let handle = service.sync(name, options)?;
    let outcome = handle.wait().await;
    service.shutdown().await;

    let report = outcome?;
    for dependency in report.failed_dependencies() {
        warn!("Dependency {} of {} was not synced", dependency, name);
    }
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}
