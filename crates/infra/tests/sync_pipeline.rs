//! End-to-end sync pipeline tests: real SQLite queues, the HTTP transport,
//! and the generic processor against a mock ingestion server.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;
use tempo_core::sync::{ProcessorConfig, QueueProcessor, SyncBacklog};
use tempo_domain::types::{ActivityRecord, ObservationKind, ScreenshotName};
use tempo_infra::api::client::ApiClientConfig;
use tempo_infra::api::transport::ApiTransport;
use tempo_infra::database::{open_store, ActivityRepository};
use tempo_infra::screenshots::{ScreenshotQueue, ScreenshotStore};
use tempo_infra::{ApiClient, DataLayout, StaticTokenProvider};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(secs: i64) -> ActivityRecord {
    ActivityRecord {
        id: 0,
        project_id: 1,
        task_id: 2,
        app_name: "Safari".to_string(),
        url: String::new(),
        timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
    }
}

fn transport(server: &MockServer) -> Arc<ApiTransport> {
    let client = ApiClient::new(
        ApiClientConfig::new(server.uri(), Duration::from_secs(5)),
        Arc::new(StaticTokenProvider::new("integration-token")),
    )
    .unwrap();
    Arc::new(ApiTransport::new(Arc::new(client)))
}

fn ack(success: bool) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": success,
        "message": if success { "stored" } else { "rejected" },
        "data": null
    }))
}

#[tokio::test]
async fn rejected_rows_survive_until_the_server_accepts_them() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DataLayout::new(dir.path().to_path_buf());
    let repo = Arc::new(ActivityRepository::new(
        open_store(&layout, ObservationKind::Activity).unwrap(),
    ));
    repo.insert(record(0)).await.unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/activities"))
        .and(header("Authorization", "integration-token"))
        .respond_with(ack(false))
        .expect(1)
        .mount(&server)
        .await;

    let processor = QueueProcessor::new(
        repo.clone(),
        transport(&server),
        ProcessorConfig::new(ObservationKind::Activity, Duration::from_secs(10)),
    );

    let report = processor.run_cycle().await;
    assert_eq!(report.rejected, 1);
    assert_eq!(repo.count().await.unwrap(), 1, "rejected row stays queued");

    // The server recovers; the same row drains on the next cycle.
    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/activities"))
        .respond_with(ack(true))
        .expect(1)
        .mount(&server)
        .await;

    let report = processor.run_cycle().await;
    assert_eq!(report.forwarded, 1);
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn transport_failures_leave_the_queue_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DataLayout::new(dir.path().to_path_buf());
    let repo = Arc::new(ActivityRepository::new(
        open_store(&layout, ObservationKind::Activity).unwrap(),
    ));
    repo.insert(record(0)).await.unwrap();
    repo.insert(record(1)).await.unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/activities"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let processor = QueueProcessor::new(
        repo.clone(),
        transport(&server),
        ProcessorConfig::new(ObservationKind::Activity, Duration::from_secs(10)),
    );

    let report = processor.run_cycle().await;
    assert_eq!(report.failed, 2);
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[tokio::test]
async fn a_cycle_drains_at_most_one_batch() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DataLayout::new(dir.path().to_path_buf());
    let repo = Arc::new(ActivityRepository::new(
        open_store(&layout, ObservationKind::Activity).unwrap(),
    ));
    for i in 0..150 {
        repo.insert(record(i)).await.unwrap();
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/activities"))
        .respond_with(ack(true))
        .expect(150)
        .mount(&server)
        .await;

    let processor = QueueProcessor::new(
        repo.clone(),
        transport(&server),
        ProcessorConfig::new(ObservationKind::Activity, Duration::from_secs(10)),
    );

    let report = processor.run_cycle().await;
    assert_eq!(report.fetched, 100);
    assert_eq!(report.forwarded, 100);
    assert_eq!(repo.count().await.unwrap(), 50);

    let report = processor.run_cycle().await;
    assert_eq!(report.forwarded, 50);
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn screenshot_files_are_the_queue_and_deletion_is_the_ack() {
    let dir = tempfile::tempdir().unwrap();
    let store = ScreenshotStore::new(dir.path()).unwrap();
    let name = ScreenshotName::new(7, -1, Utc.timestamp_opt(1_700_000_000, 0).unwrap(), "1");
    store.store(&name, b"png-bytes").await.unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/screenshots"))
        .respond_with(ack(true))
        .expect(1)
        .mount(&server)
        .await;

    let queue = Arc::new(ScreenshotQueue::new(dir.path()));
    let processor = QueueProcessor::new(
        queue.clone(),
        transport(&server),
        ProcessorConfig::new(ObservationKind::Screenshot, Duration::from_secs(120)),
    );

    let report = processor.run_cycle().await;
    assert_eq!(report.forwarded, 1);
    assert!(queue.pending(10).await.unwrap().is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    // Verify the submitted payload embedded the image.
    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["data"][0]["project_id"], 7);
    assert!(body["data"][0]["image"].is_string());
    assert!(body["data"][0].get("task_id").is_none());
}

#[tokio::test]
async fn processor_lifecycle_runs_an_immediate_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DataLayout::new(dir.path().to_path_buf());
    let repo = Arc::new(ActivityRepository::new(
        open_store(&layout, ObservationKind::Activity).unwrap(),
    ));
    repo.insert(record(0)).await.unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/activities"))
        .respond_with(ack(true))
        .mount(&server)
        .await;

    let mut processor = QueueProcessor::new(
        repo.clone(),
        transport(&server),
        ProcessorConfig::new(ObservationKind::Activity, Duration::from_secs(3600)),
    );

    processor.start().await.unwrap();
    // The first cycle fires on start, not after the first interval.
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if repo.count().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("queue drained shortly after start");

    processor.stop().await.unwrap();
    assert!(!processor.is_running());
}
