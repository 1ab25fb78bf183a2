use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;
use std::path::Path;

use crate::model::format_timestamp;
use crate::runtime::Runtime;
use crate::service::{PublishRequest, RegistryService};

/// Publish the version manifest stored at `manifest_path`.
#[tracing::instrument(skip(runtime, service, out))]
pub async fn publish<R: Runtime, W: Write>(
    runtime: &R,
    service: &RegistryService,
    manifest_path: &Path,
    tag: Option<String>,
    out: &mut W,
) -> Result<()> {
    let content = runtime.read_to_string(manifest_path)?;
    let mut request: PublishRequest = serde_json::from_str(&content)
        .with_context(|| format!("Invalid version manifest {:?}", manifest_path))?;
    if tag.is_some() {
        request.tag = tag;
    }

    let name = request.name.clone();
    let version = request.version.clone();
    let modified = service.publish(request).await?;

    writeln!(
        out,
        "{}",
        json!({
            "ok": true,
            "name": name,
            "version": version,
            "modified": format_timestamp(&modified),
        })
    )?;
    Ok(())
}
