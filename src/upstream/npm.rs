//! npm-compatible upstream implementation.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use crate::http::HttpClient;
use crate::model::PackageName;

use super::{Upstream, UpstreamManifest, UpstreamPackage};

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Fetches package documents from `<registry_url>/<name>`.
pub struct NpmUpstream {
    http_client: HttpClient,
    registry_url: String,
}

impl NpmUpstream {
    /// Create from an existing HttpClient.
    pub fn from_http_client(http_client: HttpClient, registry_url: &str) -> Self {
        Self {
            http_client,
            registry_url: registry_url.trim_end_matches('/').to_string(),
        }
    }

    fn package_url(&self, name: &str) -> String {
        let path = match name.parse::<PackageName>() {
            Ok(parsed) => parsed.url_path(),
            Err(_) => name.to_string(),
        };
        format!("{}/{}", self.registry_url, path)
    }
}

#[async_trait]
impl Upstream for NpmUpstream {
    fn registry_url(&self) -> &str {
        &self.registry_url
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_package(&self, name: &str) -> Result<UpstreamPackage> {
        let url = self.package_url(name);
        debug!("Fetching package document from {}...", url);

        let manifest: Option<UpstreamManifest> = self.http_client.get_json_opt(&url).await?;
        Ok(match manifest {
            Some(mut manifest) => {
                if manifest.name.is_empty() {
                    manifest.name = name.to_string();
                }
                UpstreamPackage::Found(manifest)
            }
            None => UpstreamPackage::NotFound,
        })
    }
}
