use anyhow::Result;
use serde_json::json;
use std::io::Write;

use crate::model::Maintainer;
use crate::service::RegistryService;

/// Adds a registry-owned maintainer to a package.
#[tracing::instrument(skip(service, out))]
pub async fn owner_add<W: Write>(
    service: &RegistryService,
    name: &str,
    user: &str,
    email: &str,
    out: &mut W,
) -> Result<()> {
    let maintainer = Maintainer {
        name: user.to_string(),
        email: email.to_string(),
    };
    let changed = service.add_maintainer(name, maintainer).await?;
    writeln!(out, "{}", json!({ "ok": true, "changed": changed }))?;
    Ok(())
}
