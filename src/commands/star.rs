use anyhow::Result;
use serde_json::json;
use std::io::Write;

use crate::service::RegistryService;

#[tracing::instrument(skip(service, out))]
pub async fn star<W: Write>(
    service: &RegistryService,
    name: &str,
    user: &str,
    out: &mut W,
) -> Result<()> {
    let changed = service.star(name, user).await?;
    writeln!(out, "{}", json!({ "ok": true, "changed": changed }))?;
    Ok(())
}

#[tracing::instrument(skip(service, out))]
pub async fn unstar<W: Write>(
    service: &RegistryService,
    name: &str,
    user: &str,
    out: &mut W,
) -> Result<()> {
    let changed = service.unstar(name, user).await?;
    writeln!(out, "{}", json!({ "ok": true, "changed": changed }))?;
    Ok(())
}
