//! Service factory: builds the registry service and its collaborators from
//! configuration.

use std::sync::Arc;

use anyhow::Result;
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};

use crate::{
    http::HttpClient,
    runtime::Runtime,
    service::RegistryService,
    store::FileStore,
    sync::SyncSettings,
    upstream::NpmUpstream,
};

use super::config::Config;

const USER_AGENT: &str = concat!("pkgmirror/", env!("PKGMIRROR_VERSION"));

/// Build an HTTP client with optional authentication token
pub fn build_http_client(token: Option<&str>) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();

    if let Some(token) = token {
        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        debug!("HTTP client configured with authentication");
    }

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()?;

    Ok(HttpClient::new(client))
}

pub fn build_upstream(config: &Config) -> Result<NpmUpstream> {
    let http_client = build_http_client(config.token.as_deref())?;
    Ok(NpmUpstream::from_http_client(http_client, &config.registry_url))
}

pub fn build_service<R: Runtime + 'static>(runtime: R, config: &Config) -> Result<RegistryService> {
    let store = FileStore::new(runtime, config.root.clone());
    let upstream = build_upstream(config)?;
    Ok(RegistryService::new(
        Arc::new(store),
        Arc::new(upstream),
        SyncSettings::default(),
        config.sync_by_install,
    ))
}
