//! HTTP client module with status classification.

mod client;
mod retry;

pub use client::HttpClient;
pub use retry::{NonRetryableError, check_retryable, classify_error};
