//! Transcription client against a mock speech-to-text service.

use std::time::Duration;

use bytes::Bytes;
use lingokit::{Error, RetryPolicy, TranscriptionClient, TranscriptionResult};
use mockito::Matcher;
use tokio_util::sync::CancellationToken;

fn fast_standard() -> RetryPolicy {
    RetryPolicy::standard().with_backoff(|_| Duration::from_millis(1))
}

fn client(base_url: &str) -> TranscriptionClient {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    TranscriptionClient::builder()
        .base_url(base_url)
        .retry_policy(fast_standard())
        .build()
        .unwrap()
}

#[tokio::test]
async fn transcribe_posts_multipart_file_and_decodes_segments() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/transcribe")
        .match_header(
            "content-type",
            Matcher::Regex("multipart/form-data.*".into()),
        )
        .match_body(Matcher::Regex(
            "name=\"file\"; filename=\"clip.wav\"".into(),
        ))
        .with_status(200)
        .with_body(
            r#"{
                "text": "hello world",
                "language": "en",
                "segments": [
                    {"index": 0, "text": "hello", "start": 0.0, "end": 0.8},
                    {"index": 1, "text": "world", "start": 0.9, "end": 1.6}
                ]
            }"#,
        )
        .create_async()
        .await;

    let result = client(&server.url())
        .transcribe(
            Bytes::from_static(b"RIFFdata"),
            "clip.wav",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.text, "hello world");
    assert_eq!(result.language.as_deref(), Some("en"));
    assert_eq!(result.segments.len(), 2);
    assert_eq!(result.segments[0].text, "hello");
}

#[tokio::test]
async fn empty_response_body_substitutes_zero_value() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/transcribe")
        .with_status(200)
        .with_body("")
        .create_async()
        .await;

    let result = client(&server.url())
        .transcribe(
            Bytes::from_static(b"RIFFdata"),
            "clip.wav",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result, TranscriptionResult::default());
}

#[tokio::test]
async fn sustained_failure_makes_exactly_three_attempts() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/transcribe")
        .with_status(502)
        .with_body("bad gateway")
        .expect(3)
        .create_async()
        .await;

    let err = client(&server.url())
        .transcribe(
            Bytes::from_static(b"RIFFdata"),
            "clip.wav",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    mock.assert_async().await;
    match err {
        Error::UpstreamRequest { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, "bad gateway");
        }
        other => panic!("expected UpstreamRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn pre_cancelled_token_sends_nothing() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/transcribe")
        .expect(0)
        .create_async()
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client(&server.url())
        .transcribe(Bytes::from_static(b"RIFFdata"), "clip.wav", &cancel)
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, Error::Cancelled));
}
