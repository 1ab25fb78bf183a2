//! Thin reqwest wrapper used to talk to the upstream registry.

use anyhow::{Context, Result};
use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::retry::{NonRetryableError, check_retryable};

/// HTTP client shared by upstream implementations.
///
/// A single call is one attempt; retrying is the caller's decision.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Performs a GET request and deserializes the JSON response.
    ///
    /// Returns `Ok(None)` when the server answers 404.
    #[tracing::instrument(skip(self))]
    pub async fn get_json_opt<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        debug!("GET JSON from {}...", url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .context("Failed to send request")?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("{} answered 404", url);
            return Ok(None);
        }

        let response = response.error_for_status().map_err(check_retryable)?;

        // The same body would come back on a retry, so a decode failure is terminal.
        let result = response
            .json::<T>()
            .await
            .map_err(|e| {
                if e.is_decode() {
                    anyhow::Error::from(NonRetryableError::InvalidResponse(e.to_string()))
                } else {
                    anyhow::Error::from(e)
                }
            })
            .context("Failed to parse JSON response")?;

        Ok(Some(result))
    }
}
