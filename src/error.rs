use thiserror::Error;

/// Unified error type for the upstream-client layer.
///
/// This aggregates every failure mode a client call can surface into the
/// categories the retry predicates key on. Mapping these to user-facing
/// codes is the calling boundary's job, not ours.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-level failure: connect errors, resets, timeouts raised by the
    /// HTTP stack. Retryable under every policy.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Explicit HTTP 503 from an upstream service. Never retried: the
    /// service told us it is down, hammering it does not help.
    #[error("upstream service unavailable (HTTP 503)")]
    ServiceUnavailable,

    /// HTTP 500 on paths where a 500 indicates a backend defect rather than
    /// a transient condition. Excluded from retry by variant.
    #[error("upstream backend failure (HTTP {status}): {body}")]
    UpstreamBackend { status: u16, body: String },

    /// Any other non-success HTTP status, with the response body captured
    /// for diagnostics. The standard policy treats these as transport-shaped
    /// and retries them; the strict policy does not.
    #[error("upstream request failed (HTTP {status}): {body}")]
    UpstreamRequest { status: u16, body: String },

    /// Empty or malformed response body.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Successful call whose decoded payload was null/absent.
    #[error("upstream returned an empty result")]
    EmptyResult,

    /// The caller's cancellation token fired. Aborts the in-flight attempt
    /// and suppresses any further retry.
    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// True for pure network failures, the only class the strict policy
    /// will retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// True for failures the standard policy retries: transport errors plus
    /// non-success statuses raised as [`Error::UpstreamRequest`].
    pub fn is_transport_shaped(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::UpstreamRequest { .. })
    }
}
