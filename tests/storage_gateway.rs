//! Object storage gateway against a mock S3-compatible store.

use bytes::Bytes;
use lingokit::{ObjectStorageGateway, StorageConfig};
use mockito::Matcher;
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

fn gateway(endpoint: &str) -> ObjectStorageGateway {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    ObjectStorageGateway::new(StorageConfig {
        endpoint: endpoint.to_string(),
        region: "us-east-1".into(),
        access_key: "minio".into(),
        secret_key: "minio123".into(),
        audio_bucket: "audio".into(),
    })
    .unwrap()
}

/// Create and set-policy match on body shape so the two PUTs to the bucket
/// path stay distinguishable: create has no body, set-policy carries the
/// policy document.
async fn bucket_mocks(
    server: &mut mockito::Server,
    bucket: &str,
    head_status: usize,
    create_hits: usize,
) -> (mockito::Mock, mockito::Mock, mockito::Mock) {
    let head = server
        .mock("HEAD", format!("/{bucket}").as_str())
        .with_status(head_status)
        .expect(1)
        .create_async()
        .await;
    let create = server
        .mock("PUT", format!("/{bucket}").as_str())
        .match_body(Matcher::Exact("".into()))
        .with_status(200)
        .expect(create_hits)
        .create_async()
        .await;
    let policy = server
        .mock("PUT", format!("/{bucket}").as_str())
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex("s3:GetObject".into()))
        .with_status(204)
        .expect(1)
        .create_async()
        .await;
    (head, create, policy)
}

#[tokio::test]
async fn upload_audio_provisions_bucket_once_across_uploads() {
    let mut server = mockito::Server::new_async().await;
    let (head, create, policy) = bucket_mocks(&mut server, "audio", 404, 1).await;
    let put_a = server
        .mock("PUT", "/audio/a.wav")
        .match_header("content-type", "audio/wav")
        .match_header(
            "authorization",
            Matcher::Regex(
                "^AWS4-HMAC-SHA256 Credential=minio/.*SignedHeaders=host;x-amz-content-sha256;x-amz-date".into(),
            ),
        )
        .match_header("x-amz-content-sha256", Matcher::Regex("^[0-9a-f]{64}$".into()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let put_b = server
        .mock("PUT", "/audio/b.wav")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let gateway = gateway(&server.url());
    let cancel = CancellationToken::new();
    let url_a = gateway
        .upload_audio(Bytes::from_static(b"RIFFa"), "a.wav", Some("user-7"), &cancel)
        .await
        .unwrap();
    let url_b = gateway
        .upload_audio(Bytes::from_static(b"RIFFb"), "b.wav", None, &cancel)
        .await
        .unwrap();

    head.assert_async().await;
    create.assert_async().await;
    policy.assert_async().await;
    put_a.assert_async().await;
    put_b.assert_async().await;
    assert_eq!(url_a, format!("{}/audio/a.wav", server.url()));
    assert_eq!(url_b, format!("{}/audio/b.wav", server.url()));
}

#[tokio::test]
async fn concurrent_first_uploads_issue_one_create_and_one_policy_call() {
    let mut server = mockito::Server::new_async().await;
    let (head, create, policy) = bucket_mocks(&mut server, "audio", 404, 1).await;

    let gateway = gateway(&server.url());
    let cancel = CancellationToken::new();
    let (first, second) = tokio::join!(
        gateway.ensure_bucket("audio", &cancel),
        gateway.ensure_bucket("audio", &cancel),
    );
    first.unwrap();
    second.unwrap();

    head.assert_async().await;
    create.assert_async().await;
    policy.assert_async().await;
}

#[tokio::test]
async fn existing_bucket_is_not_recreated_but_policy_is_ensured() {
    let mut server = mockito::Server::new_async().await;
    let (head, create, policy) = bucket_mocks(&mut server, "audio", 200, 0).await;

    let gateway = gateway(&server.url());
    let result = gateway.ensure_bucket("audio", &CancellationToken::new()).await;
    tokio_test::assert_ok!(result);

    head.assert_async().await;
    create.assert_async().await;
    policy.assert_async().await;
}

#[tokio::test]
async fn upload_image_infers_content_type_from_extension() {
    let mut server = mockito::Server::new_async().await;
    let (_head, _create, _policy) = bucket_mocks(&mut server, "avatars", 404, 1).await;
    let put = server
        .mock("PUT", "/avatars/avatar.PNG")
        .match_header("content-type", "image/png")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let gateway = gateway(&server.url());
    let url = gateway
        .upload_image(
            Bytes::from_static(b"\x89PNG"),
            "avatar.PNG",
            "user-9",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    put.assert_async().await;
    assert_eq!(url, format!("{}/avatars/avatar.PNG", server.url()));
}

#[tokio::test]
async fn failed_provisioning_is_retried_by_the_next_caller() {
    let mut server = mockito::Server::new_async().await;
    let head = server
        .mock("HEAD", "/audio")
        .with_status(500)
        .expect_at_least(2)
        .create_async()
        .await;

    let gateway = gateway(&server.url());
    let cancel = CancellationToken::new();
    assert!(gateway.ensure_bucket("audio", &cancel).await.is_err());
    // The once-per-bucket cell stays unset after a failure, so the next
    // call attempts provisioning again instead of reporting success.
    assert!(gateway.ensure_bucket("audio", &cancel).await.is_err());

    head.assert_async().await;
}
