use anyhow::Result;
use serde_json::json;
use std::io::Write;

use crate::model::format_timestamp;
use crate::service::RegistryService;

/// Point a dist-tag at an existing version and print the new modified time.
#[tracing::instrument(skip(service, out))]
pub async fn tag<W: Write>(
    service: &RegistryService,
    name: &str,
    tag: &str,
    version: &str,
    out: &mut W,
) -> Result<()> {
    let modified = service.put_tag(name, tag, version).await?;
    writeln!(
        out,
        "{}",
        json!({ "ok": true, "modified": format_timestamp(&modified) })
    )?;
    Ok(())
}
