use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use super::types::TranscriptionResult;
use crate::retry::{self, RetryPolicy};
use crate::{transport, Error, Result};

/// Client for the speech-to-text service.
pub struct TranscriptionClient {
    http: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl TranscriptionClient {
    pub fn builder() -> TranscriptionClientBuilder {
        TranscriptionClientBuilder::new()
    }

    /// Transcribe one audio clip.
    ///
    /// Builds a multipart body with a single `file` field (`audio/wav`);
    /// `filename` travels only as multipart metadata. Runs under the
    /// standard policy, so transport failures and non-success statuses are
    /// retried alike. An empty or `null` response body yields the
    /// zero-value result.
    pub async fn transcribe(
        &self,
        audio: Bytes,
        filename: &str,
        cancel: &CancellationToken,
    ) -> Result<TranscriptionResult> {
        let url = format!("{}/transcribe", self.base_url.trim_end_matches('/'));
        let start = std::time::Instant::now();

        let result = retry::execute(&self.policy, cancel, || {
            let audio = audio.clone();
            let url = url.clone();
            let filename = filename.to_string();
            async move { self.transcribe_once(&url, audio, filename).await }
        })
        .await;

        match &result {
            Ok(transcription) => tracing::info!(
                chars = transcription.text.len(),
                segments = transcription.segments.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "transcription completed"
            ),
            Err(Error::Cancelled) => {}
            Err(err) => tracing::warn!(
                error = %err,
                duration_ms = start.elapsed().as_millis() as u64,
                "transcription failed"
            ),
        }
        result
    }

    async fn transcribe_once(
        &self,
        url: &str,
        audio: Bytes,
        filename: String,
    ) -> Result<TranscriptionResult> {
        let part = reqwest::multipart::Part::stream(reqwest::Body::from(audio))
            .file_name(filename)
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self.http.post(url).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(transport::upstream_request_error(response).await);
        }

        let body = response.text().await?;
        decode_transcription(&body)
    }
}

/// Empty and `null` bodies substitute the zero value; only malformed JSON
/// is an error.
fn decode_transcription(body: &str) -> Result<TranscriptionResult> {
    if body.trim().is_empty() {
        return Ok(TranscriptionResult::default());
    }
    let decoded: Option<TranscriptionResult> =
        serde_json::from_str(body).map_err(|e| Error::Decode(e.to_string()))?;
    Ok(decoded.unwrap_or_default())
}

pub struct TranscriptionClientBuilder {
    base_url: Option<String>,
    http: Option<reqwest::Client>,
    policy: RetryPolicy,
}

impl TranscriptionClientBuilder {
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

    pub fn build(self) -> Result<TranscriptionClient> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var("LINGOKIT_STT_URL").ok())
            .ok_or_else(|| Error::Configuration("transcription base URL required".into()))?;
        let http = match self.http {
            Some(http) => http,
            None => transport::http_client()?,
        };
        Ok(TranscriptionClient {
            http,
            base_url,
            policy: self.policy,
        })
    }
}

impl Default for TranscriptionClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
