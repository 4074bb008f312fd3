use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use serde_json::Value;
use tower::ServiceExt;

use sitesync::application::fetcher::{ContentDatabases, ContentFetcher};
use sitesync::application::pipeline::BuildError;
use sitesync::application::repos::{
    ContentSource, PropertyMap, PropertyValue, QuerySpec, RawRecord, SourceError,
};
use sitesync::infra::http::{HttpState, build_router, webhook};
use sitesync::rebuild::{BuildRunner, RebuildCoordinator, RebuildRequest};

#[derive(Default)]
struct RecordingSource {
    fail: bool,
    created: Mutex<Vec<(String, PropertyMap)>>,
}

#[async_trait]
impl ContentSource for RecordingSource {
    async fn query(&self, _spec: &QuerySpec) -> Result<Vec<RawRecord>, SourceError> {
        Ok(Vec::new())
    }

    async fn block_children(&self, _record_id: &str) -> Result<Vec<Value>, SourceError> {
        Ok(Vec::new())
    }

    async fn create_record(
        &self,
        database_id: &str,
        properties: PropertyMap,
    ) -> Result<String, SourceError> {
        if self.fail {
            return Err(SourceError::unavailable("connection reset"));
        }
        self.created
            .lock()
            .unwrap()
            .push((database_id.to_string(), properties));
        Ok("contact-1".to_string())
    }
}

#[derive(Default)]
struct CountingRunner {
    runs: AtomicUsize,
}

#[async_trait]
impl BuildRunner for CountingRunner {
    async fn run(&self, _batch: &[RebuildRequest]) -> Result<(), BuildError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    router: Router,
    coordinator: RebuildCoordinator,
    runner: Arc<CountingRunner>,
    source: Arc<RecordingSource>,
}

fn harness(secret: Option<&str>, source: RecordingSource) -> Harness {
    let runner = Arc::new(CountingRunner::default());
    let coordinator = RebuildCoordinator::new(runner.clone(), Duration::from_millis(10));
    let source = Arc::new(source);
    let databases = ContentDatabases {
        contact: "db-contact".to_string(),
        ..ContentDatabases::default()
    };
    let fetcher = ContentFetcher::new(source.clone(), databases);

    let state = HttpState {
        coordinator: coordinator.clone(),
        fetcher,
        webhook_secret: secret.map(Arc::from),
        site_name: Arc::from("Woods Roofing & Exteriors"),
    };

    Harness {
        router: build_router(state),
        coordinator,
        runner,
        source,
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn status_reports_idle_state() {
    let harness = harness(None, RecordingSource::default());

    let response = harness
        .router
        .oneshot(Request::get("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["isBuilding"], false);
    assert_eq!(body["queuedCount"], 0);
    assert!(body["timestamp"].as_str().is_some_and(|ts| ts.ends_with('Z')));
}

#[tokio::test]
async fn unsigned_webhook_triggers_build_when_no_secret() {
    let harness = harness(None, RecordingSource::default());

    let response = harness
        .router
        .oneshot(post_json("/webhook/notion", r#"{"type":"page.content_updated"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Webhook processed, site rebuilding...");

    harness.coordinator.wait_idle().await;
    assert_eq!(harness.runner.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_rejected_without_building() {
    let harness = harness(Some("topsecret"), RecordingSource::default());
    let body = r#"{"type":"page.content_updated"}"#;

    let mut request = post_json("/webhook/notion", body);
    request.headers_mut().insert(
        webhook::SIGNATURE_HEADER,
        webhook::sign("wrong-secret", body.as_bytes()).parse().unwrap(),
    );
    let response = harness.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);

    let missing = harness
        .router
        .oneshot(post_json("/webhook/notion", body))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    assert!(!harness.coordinator.status().is_building);
    assert_eq!(harness.runner.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn webhook_with_valid_signature_is_accepted() {
    let harness = harness(Some("topsecret"), RecordingSource::default());
    let body = r#"{"type":"page.created"}"#;

    let mut request = post_json("/webhook/notion", body);
    request.headers_mut().insert(
        webhook::SIGNATURE_HEADER,
        webhook::sign("topsecret", body.as_bytes()).parse().unwrap(),
    );
    let response = harness.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    harness.coordinator.wait_idle().await;
    assert_eq!(harness.runner.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn manual_rebuild_acknowledges_immediately() {
    let harness = harness(None, RecordingSource::default());

    let response = harness
        .router
        .oneshot(
            Request::post("/rebuild")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Manual rebuild triggered");

    harness.coordinator.wait_idle().await;
    assert_eq!(harness.runner.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn health_names_the_site() {
    let harness = harness(None, RecordingSource::default());

    let response = harness
        .router
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["site"], "Woods Roofing & Exteriors");
    assert_eq!(body["webhook"], "enabled");
}

#[tokio::test]
async fn contact_submission_is_stored_with_defaults() {
    let harness = harness(None, RecordingSource::default());

    let response = harness
        .router
        .oneshot(post_json(
            "/submit-contact",
            r#"{"name":"Dana","email":"dana@example.com","message":"Leaky gutter"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        "Thank you for contacting Woods Roofing & Exteriors! We will get back to you soon."
    );

    let created = harness.source.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    let (database, properties) = &created[0];
    assert_eq!(database, "db-contact");
    assert_eq!(
        properties.get("Email"),
        Some(&PropertyValue::Email(Some("dana@example.com".to_string())))
    );
    assert_eq!(
        properties.get("Status"),
        Some(&PropertyValue::Select("New".to_string()))
    );
}

#[tokio::test]
async fn contact_without_reachable_details_is_rejected() {
    let harness = harness(None, RecordingSource::default());

    let response = harness
        .router
        .oneshot(post_json("/submit-contact", r#"{"name":"Dana"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(harness.source.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_contact_json_is_a_bad_request() {
    let harness = harness(None, RecordingSource::default());

    let response = harness
        .router
        .oneshot(post_json("/submit-contact", "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn contact_store_failure_hides_details() {
    let source = RecordingSource {
        fail: true,
        ..RecordingSource::default()
    };
    let harness = harness(None, source);

    let response = harness
        .router
        .oneshot(post_json("/submit-contact", r#"{"phone":"555-0100"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(!body["message"].as_str().unwrap().contains("connection reset"));
}
