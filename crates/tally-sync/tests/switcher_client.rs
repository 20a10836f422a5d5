//! SourceStatusClient against a fake digest-protected switcher.

mod common;

use common::{start_switcher, SwitcherMode, PASSWORD, USERNAME};
use tally_core::SourceId;
use tally_sync::config::SwitcherSettings;
use tally_sync::{BridgeError, SourceStatusClient, SwitcherSource};

fn settings(base_url: &str) -> SwitcherSettings {
    SwitcherSettings {
        base_url: base_url.to_string(),
        username: USERNAME.to_string(),
        password: PASSWORD.to_string(),
        timeout_secs: 2,
        ..Default::default()
    }
}

fn source(id: &str) -> SourceId {
    SourceId::new(id).unwrap()
}

#[tokio::test]
async fn fetches_labels_and_tally_through_digest_challenge() {
    let switcher = start_switcher(SwitcherMode::Healthy).await;
    let client = SourceStatusClient::new(&settings(&switcher.base_url)).unwrap();

    let labels = client.fetch_labels().await;
    assert_eq!(labels.label_for(&source("input1")), "Cam 1");
    assert_eq!(labels.label_for(&source("input2")), "Cam 2");

    let outcome = client.fetch_tally(&labels).await;
    assert!(outcome.is_ok());
    assert_eq!(outcome.snapshot.program_sources, vec![source("input1")]);
    assert_eq!(outcome.snapshot.preview_source, Some(source("input2")));

    // Each fetch is challenged once and answered once.
    let requests = switcher.requests.lock().unwrap();
    assert_eq!(requests.len(), 4);
    for headers in requests.iter() {
        assert_eq!(headers.get("accept").unwrap(), "application/xml");
        assert!(headers
            .get("user-agent")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("tally-bridge/"));
    }
}

#[tokio::test]
async fn server_error_yields_empty_snapshot_and_error() {
    let switcher = start_switcher(SwitcherMode::ServerError).await;
    let client = SourceStatusClient::new(&settings(&switcher.base_url)).unwrap();

    let labels = client.fetch_labels().await;
    assert!(labels.is_empty());

    let outcome = client.fetch_tally(&labels).await;
    assert!(outcome.snapshot.is_empty());
    assert!(matches!(
        outcome.error,
        Some(BridgeError::HttpStatus { status: 500, .. })
    ));
}

#[tokio::test]
async fn malformed_tally_document_is_reported() {
    let switcher = start_switcher(SwitcherMode::Malformed).await;
    let client = SourceStatusClient::new(&settings(&switcher.base_url)).unwrap();

    let labels = client.fetch_labels().await;
    assert_eq!(labels.len(), 2);

    let outcome = client.fetch_tally(&labels).await;
    assert!(outcome.snapshot.is_empty());
    assert!(matches!(outcome.error, Some(BridgeError::MalformedResponse(_))));
}

#[tokio::test]
async fn unreachable_switcher_never_raises() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = SourceStatusClient::new(&settings(&format!("http://{addr}"))).unwrap();

    assert!(client.fetch_labels().await.is_empty());
    let outcome = client.fetch_tally(&Default::default()).await;
    assert!(outcome.snapshot.is_empty());
    assert!(outcome.error.unwrap().is_retryable());
}
