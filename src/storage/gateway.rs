use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde_json::json;
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::sign::{self, RequestSigner};
use crate::{transport, Error, Result};

/// Fixed bucket for profile images.
pub const AVATAR_BUCKET: &str = "avatars";

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Store endpoint, e.g. `http://minio.internal:9000`.
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Shared bucket for audio recordings.
    pub audio_bucket: String,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| {
            std::env::var(name)
                .map_err(|_| Error::Configuration(format!("{name} must be set")))
        };
        Ok(Self {
            endpoint: var("LINGOKIT_S3_ENDPOINT")?,
            region: std::env::var("LINGOKIT_S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            access_key: var("LINGOKIT_S3_ACCESS_KEY")?,
            secret_key: var("LINGOKIT_S3_SECRET_KEY")?,
            audio_bucket: std::env::var("LINGOKIT_S3_AUDIO_BUCKET")
                .unwrap_or_else(|_| "audio".into()),
        })
    }
}

/// Gateway to the S3-compatible store for audio and image uploads, with
/// idempotent bucket/policy provisioning.
///
/// First-time provisioning per bucket is coalesced through a keyed
/// `OnceCell`: concurrent uploads to a brand-new bucket issue at most one
/// create-bucket and one set-policy call. A failed provisioning leaves the
/// cell unset, so the next caller retries it.
pub struct ObjectStorageGateway {
    http: reqwest::Client,
    signer: RequestSigner,
    endpoint: String,
    audio_bucket: String,
    provisioned: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
}

impl ObjectStorageGateway {
    pub fn new(config: StorageConfig) -> Result<Self> {
        Self::with_http_client(config, transport::http_client()?)
    }

    pub fn with_http_client(config: StorageConfig, http: reqwest::Client) -> Result<Self> {
        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        Url::parse(&endpoint)
            .map_err(|e| Error::Configuration(format!("invalid storage endpoint: {e}")))?;
        Ok(Self {
            http,
            signer: RequestSigner::new(config.access_key, config.secret_key, config.region),
            endpoint,
            audio_bucket: config.audio_bucket,
            provisioned: Mutex::new(HashMap::new()),
        })
    }

    /// Upload an audio clip to the shared audio bucket and return its URL.
    ///
    /// `owner_id` is carried for logging only; it does not partition
    /// storage.
    pub async fn upload_audio(
        &self,
        audio: Bytes,
        object_name: &str,
        owner_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let bucket = self.audio_bucket.clone();
        self.ensure_bucket(&bucket, cancel).await?;
        self.put_object(&bucket, object_name, audio, "audio/wav", cancel)
            .await?;
        tracing::info!(
            bucket = bucket.as_str(),
            object = object_name,
            owner = owner_id.unwrap_or("-"),
            "audio uploaded"
        );
        Ok(self.object_url(&bucket, object_name))
    }

    /// Upload a profile image to the `avatars` bucket and return its URL.
    /// Content type is inferred from the file extension; unknown extensions
    /// fall back to JPEG (best-effort by filename, no content sniffing).
    pub async fn upload_image(
        &self,
        image: Bytes,
        object_name: &str,
        owner_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.ensure_bucket(AVATAR_BUCKET, cancel).await?;
        let content_type = image_content_type(object_name);
        self.put_object(AVATAR_BUCKET, object_name, image, content_type, cancel)
            .await?;
        tracing::info!(
            bucket = AVATAR_BUCKET,
            object = object_name,
            owner = owner_id,
            content_type,
            "image uploaded"
        );
        Ok(self.object_url(AVATAR_BUCKET, object_name))
    }

    /// Make sure `name` exists with the public-read policy attached.
    /// Completed provisioning makes every later call return immediately;
    /// concurrent first calls for the same bucket coalesce onto one
    /// in-flight provisioning.
    pub async fn ensure_bucket(&self, name: &str, cancel: &CancellationToken) -> Result<()> {
        let cell = {
            let mut map = self.provisioned.lock().await;
            map.entry(name.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        cell.get_or_try_init(|| self.provision(name, cancel)).await?;
        Ok(())
    }

    async fn provision(&self, name: &str, cancel: &CancellationToken) -> Result<()> {
        if !self.bucket_exists(name, cancel).await? {
            self.create_bucket(name, cancel).await?;
            tracing::info!(bucket = name, "bucket created");
        }
        self.apply_public_read_policy(name, cancel).await?;
        Ok(())
    }

    async fn bucket_exists(&self, name: &str, cancel: &CancellationToken) -> Result<bool> {
        let url = self.bucket_url(name, None)?;
        let request = self.signed(reqwest::Method::HEAD, &url, sign::EMPTY_PAYLOAD_HASH);
        let response = transport::send(request, cancel).await?;
        match response.status().as_u16() {
            404 => Ok(false),
            _ if response.status().is_success() => Ok(true),
            status => Err(Error::UpstreamRequest {
                status,
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn create_bucket(&self, name: &str, cancel: &CancellationToken) -> Result<()> {
        let url = self.bucket_url(name, None)?;
        let request = self.signed(reqwest::Method::PUT, &url, sign::EMPTY_PAYLOAD_HASH);
        let response = transport::send(request, cancel).await?;
        // 409: the bucket appeared between the existence check and now,
        // e.g. created by another process. That is the desired end state.
        if response.status().is_success() || response.status().as_u16() == 409 {
            Ok(())
        } else {
            Err(transport::upstream_request_error(response).await)
        }
    }

    async fn apply_public_read_policy(&self, name: &str, cancel: &CancellationToken) -> Result<()> {
        let policy = json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "AWS": ["*"] },
                "Action": ["s3:GetObject"],
                "Resource": [format!("arn:aws:s3:::{name}/*")],
            }],
        })
        .to_string();

        let url = self.bucket_url(name, Some("policy"))?;
        let hash = sign::payload_hash(policy.as_bytes());
        let request = self
            .signed(reqwest::Method::PUT, &url, &hash)
            .body(policy);
        let response = transport::send(request, cancel).await?;
        if response.status().is_success() {
            tracing::debug!(bucket = name, "public-read policy applied");
            Ok(())
        } else {
            Err(transport::upstream_request_error(response).await)
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        object: &str,
        payload: Bytes,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let url = self.parse_url(&self.object_url(bucket, object))?;
        let hash = sign::payload_hash(&payload);
        let request = self
            .signed(reqwest::Method::PUT, &url, &hash)
            .header("content-type", content_type)
            .body(payload);
        let response = transport::send(request, cancel).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(transport::upstream_request_error(response).await)
        }
    }

    fn signed(
        &self,
        method: reqwest::Method,
        url: &Url,
        payload_hash: &str,
    ) -> reqwest::RequestBuilder {
        let mut request = self.http.request(method.clone(), url.clone());
        for (name, value) in self.signer.sign(method.as_str(), url, payload_hash, Utc::now()) {
            request = request.header(name, value);
        }
        request
    }

    fn bucket_url(&self, bucket: &str, query: Option<&str>) -> Result<Url> {
        let mut url = self.parse_url(&format!("{}/{bucket}", self.endpoint))?;
        url.set_query(query);
        Ok(url)
    }

    fn parse_url(&self, raw: &str) -> Result<Url> {
        Url::parse(raw).map_err(|e| Error::Configuration(format!("invalid storage URL: {e}")))
    }

    fn object_url(&self, bucket: &str, object: &str) -> String {
        format!("{}/{bucket}/{object}", self.endpoint)
    }
}

fn image_content_type(object_name: &str) -> &'static str {
    let ext = object_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}
