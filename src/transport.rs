//! Shared HTTP plumbing.
//!
//! All clients run over a pooled `reqwest::Client` with env-overridable
//! connection tuning. The client deliberately carries no request timeout:
//! deadline governance belongs to the caller's cancellation token.

use std::env;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Build the shared HTTP client with production-friendly pool defaults
/// (env-overridable).
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(
            env::var("LINGOKIT_HTTP_POOL_MAX_IDLE_PER_HOST")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(32),
        )
        .pool_idle_timeout(Some(Duration::from_secs(
            env::var("LINGOKIT_HTTP_POOL_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(90),
        )))
        .build()
        .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Send a request, racing it against cancellation. Used by callers that do
/// not go through the retry executor (which carries its own race).
pub(crate) async fn send(
    request: reqwest::RequestBuilder,
    cancel: &CancellationToken,
) -> Result<reqwest::Response> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        response = request.send() => Ok(response?),
    }
}

/// Consume a non-success response into the body-carrying request error.
pub(crate) async fn upstream_request_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::UpstreamRequest { status, body }
}
