use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::types::GrammarReport;
use crate::retry::{self, RetryPolicy};
use crate::{transport, Error, Result};

/// Client for the rule-based grammar-checking service.
pub struct GrammarCheckClient {
    http: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl GrammarCheckClient {
    pub fn builder() -> GrammarCheckClientBuilder {
        GrammarCheckClientBuilder::new()
    }

    /// Check `text` against the en-US rule set.
    ///
    /// Runs under the standard policy. On a non-success status the response
    /// body is captured into the error before the retry cycle sees it.
    pub async fn check(&self, text: &str, cancel: &CancellationToken) -> Result<GrammarReport> {
        let url = format!("{}/v2/check/json", self.base_url.trim_end_matches('/'));
        let body = json!({ "text": text, "language": "en-US" });

        let result = retry::execute(&self.policy, cancel, || {
            let url = url.clone();
            let body = body.clone();
            async move { self.check_once(&url, body).await }
        })
        .await;

        if let Err(err) = &result {
            if !matches!(err, Error::Cancelled) {
                tracing::warn!(error = %err, "grammar check failed");
            }
        }
        result
    }

    async fn check_once(&self, url: &str, body: serde_json::Value) -> Result<GrammarReport> {
        let response = self.http.post(url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(transport::upstream_request_error(response).await);
        }

        let raw: serde_json::Value = response
            .text()
            .await?
            .parse::<serde_json::Value>()
            .map_err(|e| Error::Decode(e.to_string()))?;
        Ok(build_report(raw))
    }
}

fn build_report(raw: serde_json::Value) -> GrammarReport {
    let issues = raw
        .get("matches")
        .and_then(|m| m.as_array())
        .map(|m| m.len())
        .unwrap_or(0);
    GrammarReport {
        summary: format!("found {issues} issues"),
        raw,
    }
}

pub struct GrammarCheckClientBuilder {
    base_url: Option<String>,
    http: Option<reqwest::Client>,
    policy: RetryPolicy,
}

impl GrammarCheckClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            http: None,
            policy: RetryPolicy::standard(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<GrammarCheckClient> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var("LINGOKIT_GRAMMAR_URL").ok())
            .ok_or_else(|| Error::Configuration("grammar-check base URL required".into()))?;
        let http = match self.http {
            Some(http) => http,
            None => transport::http_client()?,
        };
        Ok(GrammarCheckClient {
            http,
            base_url,
            policy: self.policy,
        })
    }
}

impl Default for GrammarCheckClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
