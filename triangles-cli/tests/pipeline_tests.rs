//! Pipeline runs against in-memory collaborators

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use triangles_cli::config::Settings;
use triangles_cli::photo::{Photo, PhotoSource};
use triangles_cli::pipeline::{Collaborators, Pipeline, RunError, Severity, Stage};
use triangles_cli::render::PassthroughRenderer;
use triangles_cli::scheduler::report_outcome;
use triangles_cli::upload::BlobUploader;
use triangles_core::{
    CancellationToken, KIND_PICTURE, KIND_UPLOAD_AUTH, Record, RelayConnector, RelayError,
    decode_reference, validate_record,
};

const TEST_SECRET: &str = "d217c1ff2f8a65c3e3a1740db3b9f58b8c848bb45e26d00ed4714e4a0f4ceecf";
const HOSTED_URL: &str = "https://cdn.example/rendered.png";

fn photo() -> Photo {
    Photo {
        id: "abc123".to_string(),
        image_url: "https://images.example/abc123.jpg".to_string(),
        width: 1080,
        height: 720,
        description: "a quiet cafe".to_string(),
        blur_hash: "LKO2?U%2Tw=w".to_string(),
        location_name: "Lisbon".to_string(),
        tags: vec!["coffee shop".to_string()],
    }
}

struct FixedPhotos {
    fail: bool,
}

#[async_trait]
impl PhotoSource for FixedPhotos {
    async fn random_photo(&self) -> Result<Photo> {
        if self.fail {
            bail!("provider unreachable");
        }
        Ok(photo())
    }

    async fn download(&self, _photo: &Photo) -> Result<Vec<u8>> {
        Ok(vec![0xff, 0xd8, 0xff])
    }
}

#[derive(Default)]
struct RecordingUploader {
    authorizations: Mutex<Vec<Record>>,
}

#[async_trait]
impl BlobUploader for RecordingUploader {
    async fn upload(&self, authorization: &Record, bytes: Vec<u8>) -> Result<String> {
        assert_eq!(bytes, vec![0xff, 0xd8, 0xff]);
        self.authorizations
            .lock()
            .unwrap()
            .push(authorization.clone());
        Ok(HOSTED_URL.to_string())
    }
}

/// Accepts relays whose address contains "good"
#[derive(Default)]
struct SelectiveConnector {
    seen: Mutex<Vec<(String, Record)>>,
}

#[async_trait]
impl RelayConnector for SelectiveConnector {
    async fn publish(&self, relay: &str, record: &Record) -> Result<String, RelayError> {
        self.seen
            .lock()
            .unwrap()
            .push((relay.to_string(), record.clone()));
        if relay.contains("good") {
            Ok(String::new())
        } else {
            Err(RelayError::Connect("connection refused".to_string()))
        }
    }
}

fn settings(relays: &[&str], pow: u8) -> Settings {
    Settings {
        secret_key: TEST_SECRET.to_string(),
        unsplash_client_id: "client".to_string(),
        relay_urls: relays.iter().map(|r| r.to_string()).collect(),
        additional_tags: vec!["triangles".to_string()],
        pow,
        relay_timeout: Duration::from_secs(2),
        ..Settings::default()
    }
}

struct Harness {
    pipeline: Pipeline,
    uploader: Arc<RecordingUploader>,
    connector: Arc<SelectiveConnector>,
}

fn harness(settings: Settings, photos_fail: bool) -> Harness {
    let uploader = Arc::new(RecordingUploader::default());
    let connector = Arc::new(SelectiveConnector::default());
    let collaborators = Collaborators {
        photos: Arc::new(FixedPhotos { fail: photos_fail }),
        renderer: Arc::new(PassthroughRenderer),
        uploader: uploader.clone(),
        connector: connector.clone(),
    };

    Harness {
        pipeline: Pipeline::new(settings, collaborators).unwrap(),
        uploader,
        connector,
    }
}

#[tokio::test]
async fn test_run_publishes_mined_post_with_partial_delivery() {
    let relays = ["wss://good.example", "wss://bad.example"];
    let h = harness(settings(&relays, 8), false);

    let report = h.pipeline.run_once(&CancellationToken::new()).await.unwrap();

    let record = &report.record;
    assert_eq!(record.kind, KIND_PICTURE);
    assert_eq!(record.id.unwrap().as_bytes()[0], 0);
    assert!(record.find_tag("nonce").is_some());
    assert!(validate_record(record).is_ok());
    assert_eq!(report.hosted_url, HOSTED_URL);
    assert!(record.content.contains("#coffee_shop"));
    assert!(record.content.contains("#triangles"));

    assert_eq!(report.broadcast.len(), 2);
    assert_eq!(report.broadcast.outcomes[0].relay, relays[0]);
    assert!(report.broadcast.outcomes[0].is_success());
    assert!(!report.broadcast.outcomes[1].is_success());

    let seen = h.connector.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|(_, sent)| sent == record.as_ref()));

    let decoded = decode_reference(&report.reference).unwrap();
    assert_eq!(decoded.id, record.id.unwrap());
    assert_eq!(decoded.relays, relays);
    assert!(report.share_url().starts_with("https://njump.me/nevent1"));

    let authorizations = h.uploader.authorizations.lock().unwrap();
    assert_eq!(authorizations.len(), 1);
    assert_eq!(authorizations[0].kind, KIND_UPLOAD_AUTH);
    assert_eq!(authorizations[0].tags[0].values, vec!["name", "unsplash-abc123"]);
}

#[tokio::test]
async fn test_no_accepting_relay_still_yields_reference() {
    let h = harness(settings(&["wss://bad.example"], 0), false);

    let outcome = h.pipeline.run_once(&CancellationToken::new()).await;
    let line = report_outcome(&outcome);

    let report = outcome.unwrap();
    assert_eq!(report.broadcast.success_count(), 0);
    assert_eq!(line, Some(report.share_url()));
}

#[tokio::test]
async fn test_provider_failure_is_transient() {
    let h = harness(settings(&["wss://good.example"], 0), true);

    let outcome = h.pipeline.run_once(&CancellationToken::new()).await;
    assert!(report_outcome(&outcome).is_none());

    let err = outcome.unwrap_err();
    assert!(matches!(
        err,
        RunError::Transient {
            stage: Stage::FetchPhoto,
            ..
        }
    ));
    assert_eq!(err.severity(), Severity::Transient);
    assert!(h.uploader.authorizations.lock().unwrap().is_empty());
    assert!(h.connector.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_mining_never_broadcasts() {
    let h = harness(settings(&["wss://good.example"], 255), false);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = h.pipeline.run_once(&cancel).await.unwrap_err();
    assert!(matches!(err, RunError::MiningAborted { .. }));
    assert_eq!(err.severity(), Severity::Transient);
    assert!(h.connector.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_mining_timeout_aborts_run() {
    let mut settings = settings(&["wss://good.example"], 255);
    settings.mining_timeout = Some(Duration::from_millis(50));
    let h = harness(settings, false);

    let err = h
        .pipeline
        .run_once(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::MiningAborted { .. }));
    assert!(h.connector.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_relay_list_reports_no_outcomes() {
    let h = harness(settings(&[], 0), false);

    let report = h.pipeline.run_once(&CancellationToken::new()).await.unwrap();
    assert!(report.broadcast.is_empty());
    assert!(decode_reference(&report.reference).unwrap().relays.is_empty());
}
