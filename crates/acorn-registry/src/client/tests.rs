//! Unit tests for registry client

use super::*;

use crate::events::recording::RecordingObserver;
use crate::http::mock::{CountingScheduler, HostBehavior, MockConnector, MockResponse};
use crate::http::{HttpConfig, TlsMode};
use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_client(connector: &MockConnector) -> RegistryClient {
    let http = HttpClient::new(
        Arc::new(connector.clone()),
        Arc::new(CountingScheduler::default()),
        HttpConfig::default(),
    );
    RegistryClient::new(http)
}

async fn local_client(mock_server: &MockServer) -> RegistryClient {
    let config = HttpConfig::default()
        .with_tls(TlsMode::Plain)
        .with_port(mock_server.address().port());
    let http = HttpClient::with_reqwest(config, Duration::from_millis(1)).unwrap();
    RegistryClient::new(http).with_host("127.0.0.1")
}

#[test]
fn test_manifest_path_keeps_scope() {
    assert_eq!(RegistryClient::manifest_path("left-pad", "1.3.0"), "/left-pad/1.3.0");
    assert_eq!(
        RegistryClient::manifest_path("@sometimes_youwin/verbal-expressions", "1.0.1"),
        "/@sometimes_youwin/verbal-expressions/1.0.1"
    );
}

#[tokio::test]
async fn test_registry_client_defaults() {
    let client = mock_client(&MockConnector::new());
    assert_eq!(client.host(), DEFAULT_REGISTRY_HOST);
    assert_eq!(client.http().config().port, 443);
}

#[tokio::test]
async fn test_get_tarball_url_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pkg/1.0.1"))
        .and(header("Accept", "*/*"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"dist":{"tarball":"https://example.com/pkg-1.0.1.tgz"}}"#,
        ))
        .mount(&mock_server)
        .await;

    let client = local_client(&mock_server).await;
    let url = client.get_tarball_url("pkg", "1.0.1").await;
    assert_eq!(url, "https://example.com/pkg-1.0.1.tgz");
}

#[tokio::test]
async fn test_not_found_is_lenient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nonexistent-package/1.0.0"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let observer = Arc::new(RecordingObserver::default());
    let client = local_client(&mock_server).await.with_observer(observer.clone());

    assert!(client.get_manifest("nonexistent-package", "1.0.0").await.is_empty());
    assert_eq!(client.get_tarball_url("nonexistent-package", "1.0.0").await, "");

    let messages = observer.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("nonexistent-package@1.0.0"));
    assert!(messages[0].contains("status"));
}

#[tokio::test]
async fn test_scoped_package_path_is_verbatim() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/@types/node/20.0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "@types/node",
            "version": "20.0.0",
            "dist": { "tarball": "https://registry.npmjs.org/@types/node/-/node-20.0.0.tgz" }
        })))
        .mount(&mock_server)
        .await;

    let client = local_client(&mock_server).await;
    let manifest = client.fetch_manifest("@types/node", "20.0.0").await.unwrap();
    assert_eq!(manifest.name(), "@types/node");
    assert!(manifest.tarball_url().ends_with("node-20.0.0.tgz"));
}

#[tokio::test]
async fn test_malformed_body_yields_empty_manifest() {
    let bodies: [&[u8]; 3] = [b"<html>oops</html>", b"[1, 2]", b"\xff\xfe"];
    for body in bodies {
        let connector =
            MockConnector::new().route(DEFAULT_REGISTRY_HOST, "/pkg/1.0.0", MockResponse::ok(body));
        let observer = Arc::new(RecordingObserver::default());
        let client = mock_client(&connector).with_observer(observer.clone());

        assert!(client.get_manifest("pkg", "1.0.0").await.is_empty());
        assert_eq!(client.get_tarball_url("pkg", "1.0.0").await, "");
        assert!(observer.messages()[0].contains("decode"));

        assert!(matches!(
            client.fetch_manifest("pkg", "1.0.0").await,
            Err(AcornError::Decode { .. })
        ));
    }
}

#[tokio::test]
async fn test_missing_dist_yields_empty_url() {
    let connector = MockConnector::new().route(
        DEFAULT_REGISTRY_HOST,
        "/pkg/1.0.0",
        MockResponse::ok(br#"{"name": "pkg", "dist": {"shasum": "abc"}}"#),
    );
    let client = mock_client(&connector);

    assert!(!client.get_manifest("pkg", "1.0.0").await.is_empty());
    assert_eq!(client.get_tarball_url("pkg", "1.0.0").await, "");
}

#[tokio::test]
async fn test_resolve_tarball_distinguishes_failures() {
    let connector = MockConnector::new()
        .route(
            DEFAULT_REGISTRY_HOST,
            "/present/1.0.0",
            MockResponse::ok(br#"{"dist": {"tarball": "https://example.com/present.tgz", "shasum": "abc"}}"#),
        )
        .route(DEFAULT_REGISTRY_HOST, "/no-dist/1.0.0", MockResponse::ok(br#"{"name": "no-dist"}"#))
        .route(DEFAULT_REGISTRY_HOST, "/empty/1.0.0", MockResponse::ok(b"{}"))
        .route(DEFAULT_REGISTRY_HOST, "/broken/1.0.0", MockResponse::with_status(500, b""));
    let client = mock_client(&connector);

    let tarball = client.resolve_tarball("present", "1.0.0").await.unwrap();
    assert_eq!(tarball.url, "https://example.com/present.tgz");
    assert_eq!(tarball.shasum.as_deref(), Some("abc"));

    assert!(matches!(
        client.resolve_tarball("missing", "1.0.0").await,
        Err(AcornError::PackageNotFound { .. })
    ));
    assert!(matches!(
        client.resolve_tarball("empty", "1.0.0").await,
        Err(AcornError::PackageNotFound { .. })
    ));
    assert!(matches!(
        client.resolve_tarball("no-dist", "1.0.0").await,
        Err(AcornError::TarballNotFound { .. })
    ));
    assert!(matches!(
        client.resolve_tarball("broken", "1.0.0").await,
        Err(AcornError::UnexpectedStatus { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_network_fault_is_not_not_found() {
    let connector = MockConnector::new().host(DEFAULT_REGISTRY_HOST, HostBehavior::ConnectFails);
    let client = mock_client(&connector);

    let err = client.resolve_tarball("pkg", "1.0.0").await.unwrap_err();
    assert!(matches!(err, AcornError::Connection { .. }));
    assert!(!err.is_not_found());
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_mirror_host() {
    let connector = MockConnector::new().route(
        "mirror.local",
        "/pkg/1.0.0",
        MockResponse::ok(br#"{"dist": {"tarball": "https://mirror.local/pkg.tgz"}}"#),
    );
    let client = mock_client(&connector).with_host("mirror.local");

    assert_eq!(client.get_tarball_url("pkg", "1.0.0").await, "https://mirror.local/pkg.tgz");
    assert_eq!(connector.requests()[0].0, "mirror.local");
}
