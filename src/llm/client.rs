use serde::de::DeserializeOwned;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::types::{GrammarCorrection, ScoreResult};
use crate::retry::{self, RetryPolicy};
use crate::{transport, Error, Result};

/// Client for the LLM service's three operations, each under its own
/// classification rules: scoring (fail fast on 503), free-form generation
/// (typed or opaque decode), and grammar correction (strict policy, 500 is
/// a backend defect and never retried).
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    standard: RetryPolicy,
    strict: RetryPolicy,
}

impl LlmClient {
    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    /// Score a spoken answer against its question.
    ///
    /// HTTP 503 is classified as [`Error::ServiceUnavailable`] before any
    /// generic status check, so service unavailability fails fast instead
    /// of burning the retry budget. Every other non-success status is
    /// retried under the standard policy.
    pub async fn score(
        &self,
        transcription: &str,
        question_text: &str,
        language: &str,
        feedback_language: &str,
        cancel: &CancellationToken,
    ) -> Result<ScoreResult> {
        let url = format!("{}/api/v2/score", self.base_url.trim_end_matches('/'));
        let body = json!({
            "transcription": transcription,
            "questionText": question_text,
            "language": language,
            "feedbackLanguage": feedback_language,
        });

        let result = retry::execute(&self.standard, cancel, || {
            let url = url.clone();
            let body = body.clone();
            async move {
                let response = self.http.post(&url).json(&body).send().await?;
                if response.status().as_u16() == 503 {
                    return Err(Error::ServiceUnavailable);
                }
                if !response.status().is_success() {
                    return Err(transport::upstream_request_error(response).await);
                }
                let body = response.text().await?;
                decode_optional::<ScoreResult>(&body)?.ok_or(Error::EmptyResult)
            }
        })
        .await;

        if let Err(err) = &result {
            if !matches!(err, Error::Cancelled) {
                tracing::warn!(error = %err, "scoring failed");
            }
        }
        result
    }

    /// Generate into a caller-declared schema. A `null` payload on an
    /// otherwise-successful response is [`Error::EmptyResult`].
    pub async fn generate<T: DeserializeOwned>(
        &self,
        prompt: &str,
        task_type: &str,
        context: &str,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let body = self.generate_raw(prompt, task_type, context, cancel).await?;
        decode_optional::<T>(&body)?.ok_or(Error::EmptyResult)
    }

    /// Generate in opaque-document mode: the parsed JSON document is
    /// returned unbound to any schema, for callers whose response shape
    /// varies by request. An empty or whitespace body is a decode error
    /// raised before the parser is ever invoked.
    pub async fn generate_document(
        &self,
        prompt: &str,
        task_type: &str,
        context: &str,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value> {
        let body = self.generate_raw(prompt, task_type, context, cancel).await?;
        if body.trim().is_empty() {
            return Err(Error::Decode("empty response body".into()));
        }
        serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))
    }

    async fn generate_raw(
        &self,
        prompt: &str,
        task_type: &str,
        context: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let body = json!({
            "prompt": prompt,
            "task_type": task_type,
            "context": context,
            "format": null,
        });

        let result = retry::execute(&self.standard, cancel, || {
            let url = url.clone();
            let body = body.clone();
            async move {
                let response = self.http.post(&url).json(&body).send().await?;
                if !response.status().is_success() {
                    return Err(transport::upstream_request_error(response).await);
                }
                Ok(response.text().await?)
            }
        })
        .await;

        if let Err(err) = &result {
            if !matches!(err, Error::Cancelled) {
                tracing::warn!(error = %err, task_type, "generation failed");
            }
        }
        result
    }

    /// Correct the grammar of a transcription.
    ///
    /// Strict policy: one retry after 1s, and only for pure transport
    /// failures. HTTP 503 fails fast as [`Error::ServiceUnavailable`];
    /// HTTP 500 is [`Error::UpstreamBackend`] and must never be sent a
    /// second time, since it signals a backend defect rather than a
    /// transient condition.
    pub async fn correct_grammar(
        &self,
        transcription: &str,
        language: &str,
        question_text: &str,
        cancel: &CancellationToken,
    ) -> Result<GrammarCorrection> {
        let url = format!(
            "{}/api/v2/grammar/correct",
            self.base_url.trim_end_matches('/')
        );
        let body = json!({
            "transcription": transcription,
            "language": language,
            "questionText": question_text,
        });

        let result = retry::execute(&self.strict, cancel, || {
            let url = url.clone();
            let body = body.clone();
            async move {
                let response = self.http.post(&url).json(&body).send().await?;
                let status = response.status().as_u16();
                match status {
                    503 => return Err(Error::ServiceUnavailable),
                    500 => {
                        let body = response.text().await.unwrap_or_default();
                        return Err(Error::UpstreamBackend { status, body });
                    }
                    _ if !response.status().is_success() => {
                        return Err(transport::upstream_request_error(response).await);
                    }
                    _ => {}
                }
                let body = response.text().await?;
                decode_optional::<GrammarCorrection>(&body)?.ok_or(Error::EmptyResult)
            }
        })
        .await;

        if let Err(err) = &result {
            if !matches!(err, Error::Cancelled) {
                tracing::warn!(error = %err, "grammar correction failed");
            }
        }
        result
    }
}

/// Decode a body that may legitimately be JSON `null` or empty. `None`
/// means "successful call, no payload"; only malformed JSON is an error.
fn decode_optional<T: DeserializeOwned>(body: &str) -> Result<Option<T>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(body).map_err(|e| Error::Decode(e.to_string()))
}

pub struct LlmClientBuilder {
    base_url: Option<String>,
    http: Option<reqwest::Client>,
    standard: RetryPolicy,
    strict: RetryPolicy,
}

impl LlmClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            http: None,
            standard: RetryPolicy::standard(),
            strict: RetryPolicy::strict(),
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

    /// Policy for scoring and generation.
    pub fn standard_policy(mut self, policy: RetryPolicy) -> Self {
        self.standard = policy;
        self
    }

    /// Policy for grammar correction.
    pub fn strict_policy(mut self, policy: RetryPolicy) -> Self {
        self.strict = policy;
        self
    }

    pub fn build(self) -> Result<LlmClient> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var("LINGOKIT_LLM_URL").ok())
            .ok_or_else(|| Error::Configuration("LLM base URL required".into()))?;
        let http = match self.http {
            Some(http) => http,
            None => transport::http_client()?,
        };
        Ok(LlmClient {
            http,
            base_url,
            standard: self.standard,
            strict: self.strict,
        })
    }
}

impl Default for LlmClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
