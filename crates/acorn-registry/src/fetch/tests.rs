//! Unit tests for the package fetcher

use super::*;

use crate::events::recording::RecordingObserver;
use crate::events::EventBus;
use crate::http::mock::{CountingScheduler, MockConnector, MockResponse};
use crate::http::{HttpConfig, TlsMode};
use acorn_core::utils::hash::sha1_hex;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REGISTRY: &str = "registry.npmjs.org";
const VERBAL_NAME: &str = "@sometimes_youwin/verbal-expressions";
const VERBAL_TARBALL_PATH: &str =
    "/@sometimes_youwin/verbal-expressions/-/verbal-expressions-1.0.1.tgz";
const TARBALL_BYTES: &[u8] = b"\x1f\x8b\x08\x00fake-gzip-archive";

fn manifest_for(tarball_url: &str, shasum: Option<&str>) -> Vec<u8> {
    let mut dist = serde_json::json!({ "tarball": tarball_url });
    if let Some(shasum) = shasum {
        dist["shasum"] = serde_json::Value::String(shasum.to_string());
    }
    serde_json::to_vec(&serde_json::json!({ "dist": dist })).unwrap()
}

fn verbal_registry() -> MockConnector {
    let tarball_url = format!("https://{}{}", REGISTRY, VERBAL_TARBALL_PATH);
    MockConnector::new()
        .route(
            REGISTRY,
            "/@sometimes_youwin/verbal-expressions/1.0.1",
            MockResponse::ok(&manifest_for(&tarball_url, None)),
        )
        .route(REGISTRY, VERBAL_TARBALL_PATH, MockResponse::ok(TARBALL_BYTES))
}

fn fetcher_for(connector: &MockConnector, observer: Arc<RecordingObserver>) -> PackageFetcher {
    let http = HttpClient::new(
        Arc::new(connector.clone()),
        Arc::new(CountingScheduler::default()),
        HttpConfig::default(),
    );
    let registry = RegistryClient::new(http).with_observer(observer.clone());
    PackageFetcher::new(registry).with_observer(observer)
}

#[tokio::test]
async fn test_fetch_verbal_expressions() {
    let connector = verbal_registry();
    let observer = Arc::new(RecordingObserver::default());
    let fetcher = fetcher_for(&connector, observer.clone());

    let fetched = fetcher
        .fetch(&Package::direct(VERBAL_NAME, "1.0.1"))
        .await
        .unwrap();

    assert_eq!(fetched.bytes, TARBALL_BYTES);
    assert_eq!(
        fetched.destination,
        Utf8PathBuf::from("addons/verbal-expressions/verbal-expressions.tar.gz")
    );
    assert!(fetched.tarball_url.ends_with("verbal-expressions-1.0.1.tgz"));
    assert_eq!(observer.started(), vec!["@sometimes_youwin/verbal-expressions@1.0.1"]);
    assert!(observer.messages().is_empty());

    let paths: Vec<String> = connector
        .requests()
        .into_iter()
        .map(|(_, request)| request.path)
        .collect();
    assert_eq!(
        paths,
        vec![
            "/@sometimes_youwin/verbal-expressions/1.0.1".to_string(),
            VERBAL_TARBALL_PATH.to_string()
        ]
    );
    assert_eq!(connector.live_transports(), 0);
}

#[tokio::test]
async fn test_indirect_package_goes_under_versioned_deps() {
    let connector = verbal_registry();
    let fetcher = fetcher_for(&connector, Arc::default());

    let fetched = fetcher
        .fetch(&Package::indirect(VERBAL_NAME, "1.0.1"))
        .await
        .unwrap();

    assert_eq!(
        fetched.destination,
        Utf8PathBuf::from("addons/__deps/1.0.1/verbal-expressions/verbal-expressions.tar.gz")
    );
}

#[tokio::test]
async fn test_custom_layout() {
    let connector = verbal_registry();
    let fetcher = fetcher_for(&connector, Arc::default())
        .with_layout(AddonLayout::new("res/addons", "shared"));

    let fetched = fetcher
        .fetch(&Package::indirect(VERBAL_NAME, "1.0.1"))
        .await
        .unwrap();

    assert_eq!(
        fetched.destination,
        Utf8PathBuf::from("res/addons/shared/1.0.1/verbal-expressions/verbal-expressions.tar.gz")
    );
}

#[tokio::test]
async fn test_missing_package_stops_before_download() {
    let connector = MockConnector::new();
    let observer = Arc::new(RecordingObserver::default());
    let fetcher = fetcher_for(&connector, observer.clone());

    let err = fetcher
        .fetch(&Package::direct("missing", "1.0.0"))
        .await
        .unwrap_err();

    assert!(matches!(err, AcornError::PackageNotFound { .. }));
    assert_eq!(connector.requests().len(), 1);

    let messages = observer.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("missing@1.0.0"));
    assert!(messages[0].contains("resolve"));
    assert!(messages[0].contains(REGISTRY));
}

#[tokio::test]
async fn test_manifest_without_tarball() {
    let connector = MockConnector::new().route(
        REGISTRY,
        "/pkg/1.0.0",
        MockResponse::ok(br#"{"name": "pkg", "version": "1.0.0"}"#),
    );
    let fetcher = fetcher_for(&connector, Arc::default());

    let err = fetcher.fetch(&Package::direct("pkg", "1.0.0")).await.unwrap_err();
    assert!(matches!(err, AcornError::TarballNotFound { .. }));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_tarball_url_without_host() {
    let connector = MockConnector::new().route(
        REGISTRY,
        "/pkg/1.0.0",
        MockResponse::ok(&manifest_for("/pkg/-/pkg-1.0.0.tgz", None)),
    );
    let fetcher = fetcher_for(&connector, Arc::default());

    let err = fetcher.fetch(&Package::direct("pkg", "1.0.0")).await.unwrap_err();
    assert!(matches!(err, AcornError::InvalidTarballUrl { .. }));
    assert_eq!(connector.connects().len(), 1);
}

#[tokio::test]
async fn test_download_failure_names_tarball_host() {
    let connector = MockConnector::new()
        .route(
            REGISTRY,
            "/pkg/1.0.0",
            MockResponse::ok(&manifest_for("https://cdn.example.com/pkg-1.0.0.tgz", None)),
        )
        .route("cdn.example.com", "/pkg-1.0.0.tgz", MockResponse::with_status(503, b""));
    let observer = Arc::new(RecordingObserver::default());
    let fetcher = fetcher_for(&connector, observer.clone());

    let err = fetcher.fetch(&Package::direct("pkg", "1.0.0")).await.unwrap_err();
    assert!(matches!(err, AcornError::UnexpectedStatus { status: 503, .. }));
    assert!(!err.is_not_found());

    let messages = observer.messages();
    assert!(messages[0].contains("cdn.example.com"));
    assert!(messages[0].contains("status"));
}

#[tokio::test]
async fn test_tarball_host_uses_default_port() {
    for (registry_tls, registry_port, tarball_url, expected) in [
        (TlsMode::Plain, 4873, "http://cdn.example.com/pkg-1.0.0.tgz", (80, TlsMode::Plain)),
        (TlsMode::Secure, 8443, "https://cdn.example.com/pkg-1.0.0.tgz", (443, TlsMode::Secure)),
        (TlsMode::Secure, 8443, "http://cdn.example.com/pkg-1.0.0.tgz", (80, TlsMode::Plain)),
    ] {
        let connector = MockConnector::new()
            .route("npm.corp", "/pkg/1.0.0", MockResponse::ok(&manifest_for(tarball_url, None)))
            .route("cdn.example.com", "/pkg-1.0.0.tgz", MockResponse::ok(TARBALL_BYTES));
        let http = HttpClient::new(
            Arc::new(connector.clone()),
            Arc::new(CountingScheduler::default()),
            HttpConfig::default().with_tls(registry_tls).with_port(registry_port),
        );
        let fetcher = PackageFetcher::new(RegistryClient::new(http).with_host("npm.corp"));

        let fetched = fetcher.fetch(&Package::direct("pkg", "1.0.0")).await.unwrap();
        assert_eq!(fetched.bytes, TARBALL_BYTES);
        assert_eq!(
            connector.connects(),
            vec![
                ("npm.corp".to_string(), registry_port, registry_tls),
                ("cdn.example.com".to_string(), expected.0, expected.1),
            ],
            "{}",
            tarball_url
        );
    }
}

#[tokio::test]
async fn test_integrity_check() {
    let tarball_url = "https://cdn.example.com/pkg-1.0.0.tgz";
    let good = sha1_hex(TARBALL_BYTES);

    for (shasum, verify, ok) in [
        (good.as_str(), true, true),
        ("0000000000000000000000000000000000000000", true, false),
        ("0000000000000000000000000000000000000000", false, true),
    ] {
        let connector = MockConnector::new()
            .route(REGISTRY, "/pkg/1.0.0", MockResponse::ok(&manifest_for(tarball_url, Some(shasum))))
            .route("cdn.example.com", "/pkg-1.0.0.tgz", MockResponse::ok(TARBALL_BYTES));
        let fetcher = fetcher_for(&connector, Arc::default()).with_integrity_check(verify);

        let result = fetcher.fetch(&Package::direct("pkg", "1.0.0")).await;
        if ok {
            assert!(result.is_ok(), "{} verify={}", shasum, verify);
        } else {
            assert!(matches!(result, Err(AcornError::IntegrityFailure { .. })));
        }
    }
}

#[tokio::test]
async fn test_event_bus_observer() {
    let connector = verbal_registry();
    let bus = EventBus::default();
    let mut started = bus.subscribe_started();
    let fetcher = fetcher_for(&connector, Arc::default()).with_observer(Arc::new(bus));

    fetcher
        .fetch(&Package::direct(VERBAL_NAME, "1.0.1"))
        .await
        .unwrap();

    assert_eq!(started.recv().await.unwrap(), "@sometimes_youwin/verbal-expressions@1.0.1");
}

#[tokio::test]
async fn test_fetch_against_local_registry() {
    let mock_server = MockServer::start().await;
    let port = mock_server.address().port();
    let tarball_url = format!("http://127.0.0.1:{}/left-pad/-/left-pad-1.3.0.tgz", port);

    Mock::given(method("GET"))
        .and(path("/left-pad/1.3.0"))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(manifest_for(&tarball_url, None)),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/left-pad/-/left-pad-1.3.0.tgz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(TARBALL_BYTES.to_vec()))
        .mount(&mock_server)
        .await;

    let config = HttpConfig::default().with_tls(TlsMode::Plain).with_port(port);
    let http = HttpClient::with_reqwest(config, Duration::from_millis(1)).unwrap();
    let fetcher = PackageFetcher::new(RegistryClient::new(http).with_host("127.0.0.1"));

    let fetched = fetcher
        .fetch(&Package::direct("left-pad", "1.3.0"))
        .await
        .unwrap();
    assert_eq!(fetched.bytes, TARBALL_BYTES);
    assert_eq!(fetched.destination, Utf8PathBuf::from("addons/left-pad/left-pad.tar.gz"));
}
