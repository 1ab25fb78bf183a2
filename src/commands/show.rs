use anyhow::Result;
use log::{debug, info};
use std::io::Write;

use crate::cache::ConditionalRequest;
use crate::service::{ReadResponse, RegistryService};

/// Print a package document. Returns false when the package is unknown or
/// unpublished.
#[tracing::instrument(skip(service, out))]
pub async fn show<W: Write>(
    service: &RegistryService,
    name: &str,
    if_none_match: Option<String>,
    out: &mut W,
) -> Result<bool> {
    let request = ConditionalRequest { if_none_match };
    let response = service.read(name, &request).await?;
    service.shutdown().await;

    match response {
        ReadResponse::Full { body, validator } => {
            writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
            eprintln!("etag: {}", validator);
            Ok(true)
        }
        ReadResponse::NotModified { validator } => {
            info!("{} not modified ({})", name, validator);
            Ok(true)
        }
        ReadResponse::Unpublished { body } => {
            debug!("{} has been unpublished", name);
            writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
            Ok(false)
        }
        ReadResponse::NotFound(body) => {
            writeln!(out, "{}", serde_json::to_string(&body)?)?;
            Ok(false)
        }
    }
}
