//! AWS Signature V4 for the S3-compatible store.
//!
//! Only the header-based signing the gateway needs: `host`,
//! `x-amz-content-sha256` and `x-amz-date` are the signed headers, the
//! payload hash is the hex SHA-256 of the actual body.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

/// Hex SHA-256 of the empty string, used for bodyless requests.
pub const EMPTY_PAYLOAD_HASH: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

pub fn payload_hash(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

pub struct RequestSigner {
    access_key: String,
    secret_key: String,
    region: String,
}

impl RequestSigner {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region.into(),
        }
    }

    /// Produce the `authorization`, `x-amz-date` and `x-amz-content-sha256`
    /// headers for a request. The URL's path must already be in canonical
    /// (percent-encoded) form, which `url::Url` guarantees for paths it
    /// builds.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        payload_hash: &str,
        now: DateTime<Utc>,
    ) -> Vec<(&'static str, String)> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let host = host_header(url);

        let canonical_headers = format!(
            "host:{host}\nx-amz-content-sha256:{payload_hash}\nx-amz-date:{amz_date}\n"
        );
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";
        let canonical_request = format!(
            "{method}\n{path}\n{query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
            path = url.path(),
            query = canonical_query(url),
        );

        let scope = format!("{date}/{}/{SERVICE}/aws4_request", self.region);
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            payload_hash_str(&canonical_request)
        );

        let key = self.signing_key(&date, SERVICE);
        let signature = hex::encode(hmac(&key, string_to_sign.as_bytes()));
        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.access_key
        );

        vec![
            ("authorization", authorization),
            ("x-amz-date", amz_date),
            ("x-amz-content-sha256", payload_hash.to_string()),
        ]
    }

    fn signing_key(&self, date: &str, service: &str) -> Vec<u8> {
        let secret = format!("AWS4{}", self.secret_key);
        let k_date = hmac(secret.as_bytes(), date.as_bytes());
        let k_region = hmac(&k_date, self.region.as_bytes());
        let k_service = hmac(&k_region, service.as_bytes());
        hmac(&k_service, b"aws4_request")
    }
}

fn payload_hash_str(input: &str) -> String {
    payload_hash(input.as_bytes())
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn uri_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // Signing-key derivation vector from the AWS SigV4 documentation.
    #[test]
    fn signing_key_matches_aws_reference_vector() {
        let signer = RequestSigner::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "us-east-1",
        );
        let key = signer.signing_key("20150830", "iam");
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn empty_payload_hash_constant_is_sha256_of_nothing() {
        assert_eq!(payload_hash(b""), EMPTY_PAYLOAD_HASH);
    }

    #[test]
    fn sign_emits_the_three_headers_with_hex_signature() {
        let signer = RequestSigner::new("minioadmin", "minioadmin", "us-east-1");
        let url = Url::parse("http://localhost:9000/audio/clip.wav").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let headers = signer.sign("PUT", &url, EMPTY_PAYLOAD_HASH, now);

        assert_eq!(headers[1], ("x-amz-date", "20240501T120000Z".into()));
        assert_eq!(headers[2].0, "x-amz-content-sha256");
        let auth = &headers[0].1;
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=minioadmin/20240501/us-east-1/s3/aws4_request"
        ));
        let signature = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn canonical_query_sorts_and_keeps_empty_values() {
        let url = Url::parse("http://localhost:9000/bucket?policy&b=2&a=1").unwrap();
        assert_eq!(canonical_query(&url), "a=1&b=2&policy=");
    }

    #[test]
    fn host_header_keeps_nonstandard_port() {
        let url = Url::parse("http://minio.internal:9000/b").unwrap();
        assert_eq!(host_header(&url), "minio.internal:9000");
        let url = Url::parse("https://s3.example.com/b").unwrap();
        assert_eq!(host_header(&url), "s3.example.com");
    }
}
