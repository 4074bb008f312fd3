use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use sitesync::application::fetcher::{ContentDatabases, ContentFetcher};
use sitesync::application::merge::TemplateMerger;
use sitesync::application::pipeline::{BuildError, SitePipeline};
use sitesync::application::repos::{
    ContentSource, DocumentStore, PropertyMap, QuerySpec, RawRecord, SourceError, StoreError,
};
use sitesync::application::seo::SiteProfile;
use sitesync::infra::store::FsDocumentStore;

const BLOGS_TEMPLATE: &str = r#"<html><head><title>Blog</title></head><body><div class="w-dyn-list"><div role="list" class="w-dyn-items"><div class="placeholder">Lorem</div></div><div class="w-dyn-empty"><div>No items found.</div></div></div></body></html>"#;

const SERVICES_TEMPLATE: &str = r#"<html><head><title>Services</title></head><body><div class="service-list"><p>Old list</p></div><footer>Call (513) 320-9436</footer></body></html>"#;

const INDEX_TEMPLATE: &str = r#"<html><head><title>Old title</title><meta name="description" content="old"></head><body><section class="service-section"><div class="service-list w-dyn-items"></div><div class="w-dyn-empty">Nothing yet</div></section><section class="testimonial-section"><div class="w-dyn-items"></div></section></body></html>"#;

/// Serves fixed records per database and one paragraph per page body.
struct FixtureSource {
    databases: HashMap<String, Vec<RawRecord>>,
    unavailable: Vec<String>,
}

#[async_trait]
impl ContentSource for FixtureSource {
    async fn query(&self, spec: &QuerySpec) -> Result<Vec<RawRecord>, SourceError> {
        if self.unavailable.contains(&spec.database_id) {
            return Err(SourceError::unavailable("503 from upstream"));
        }
        Ok(self
            .databases
            .get(&spec.database_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn block_children(&self, record_id: &str) -> Result<Vec<Value>, SourceError> {
        Ok(vec![json!({
            "type": "paragraph",
            "paragraph": {"rich_text": [{"plain_text": format!("Body of {record_id}")}]}
        })])
    }

    async fn create_record(
        &self,
        _database_id: &str,
        _properties: PropertyMap,
    ) -> Result<String, SourceError> {
        Ok("unused".to_string())
    }
}

fn record(id: &str, properties: Value) -> RawRecord {
    RawRecord {
        id: id.to_string(),
        created_time: Some("2024-03-01T10:00:00.000Z".to_string()),
        properties: properties.as_object().cloned().unwrap_or_default(),
    }
}

fn databases() -> ContentDatabases {
    ContentDatabases {
        blogs: "blogs".to_string(),
        services: "services".to_string(),
        testimonials: "testimonials".to_string(),
        contact: "contact".to_string(),
    }
}

fn fixture_source(unavailable: &[&str]) -> FixtureSource {
    let mut databases = HashMap::new();
    databases.insert(
        "blogs".to_string(),
        vec![
            record(
                "post-1",
                json!({
                    "Title": {"title": [{"plain_text": "Spring Roof Check"}]},
                    "Excerpt": {"rich_text": [{"plain_text": "What to look for"}]},
                    "Published": {"checkbox": true},
                    "Slug": {"rich_text": [{"plain_text": "Spring Roof Check"}]}
                }),
            ),
            record(
                "post-2",
                json!({
                    "Title": {"title": [{"plain_text": "Draft Post"}]},
                    "Published": {"checkbox": false}
                }),
            ),
        ],
    );
    databases.insert(
        "services".to_string(),
        vec![record(
            "svc-1",
            json!({
                "Title": {"title": [{"plain_text": "Roof Repair"}]},
                "ShortDescription": {"rich_text": [{"plain_text": "Fast fixes"}]},
                "Slug": {"rich_text": [{"plain_text": "roof-repair"}]}
            }),
        )],
    );
    databases.insert(
        "testimonials".to_string(),
        vec![record(
            "t-1",
            json!({
                "Name": {"title": [{"plain_text": "Pat"}]},
                "Review": {"rich_text": [{"plain_text": "Great crew"}]},
                "Rating": {"number": 5}
            }),
        )],
    );

    FixtureSource {
        databases,
        unavailable: unavailable.iter().map(|id| id.to_string()).collect(),
    }
}

fn site() -> SiteProfile {
    SiteProfile {
        site_name: "Woods Roofing & Exteriors".to_string(),
        site_url: "https://woodsroofing.example".to_string(),
        description: "Roofing in Southwest Ohio".to_string(),
        keywords: vec!["roofing".to_string()],
        default_image: "/images/Hero-Image.png".to_string(),
        business_type: "RoofingContractor".to_string(),
        home_title: Some("Roofing in Southwest Ohio".to_string()),
        ..SiteProfile::default()
    }
}

async fn seeded_store(dir: &std::path::Path) -> FsDocumentStore {
    let store = FsDocumentStore::new(dir);
    store.write("blogs.html", BLOGS_TEMPLATE).await.unwrap();
    store.write("service.html", SERVICES_TEMPLATE).await.unwrap();
    store.write("index.html", INDEX_TEMPLATE).await.unwrap();
    store
}

fn pipeline(source: FixtureSource, store: FsDocumentStore) -> SitePipeline {
    let fetcher = ContentFetcher::new(Arc::new(source), databases());
    SitePipeline::new(fetcher, TemplateMerger::new(Arc::new(store)), site())
}

#[tokio::test]
async fn build_merges_listings_and_writes_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = seeded_store(dir.path()).await;
    let pipeline = pipeline(fixture_source(&[]), store.clone());

    let report = pipeline.build().await.expect("build succeeds");
    assert_eq!(report.posts, 2);
    assert_eq!(report.services, 1);
    assert_eq!(report.testimonials, 1);

    let blogs = store.read("blogs.html").await.unwrap();
    assert!(blogs.contains("Spring Roof Check"));
    assert!(!blogs.contains("Draft Post"));
    assert!(!blogs.contains("Lorem"));
    assert!(blogs.contains(r#"class="w-dyn-empty" style="display:none""#));
    assert!(blogs.contains("detail_blogs.html?id=spring-roof-check"));

    let services = store.read("service.html").await.unwrap();
    assert!(services.contains("Roof Repair"));
    assert!(!services.contains("Old list"));
    assert!(services.ends_with("<footer>Call (513) 320-9436</footer></body></html>"));

    let index = store.read("index.html").await.unwrap();
    assert!(index.contains("Great crew"));
    assert!(index.contains(
        "<title>Roofing in Southwest Ohio | Woods Roofing &amp; Exteriors</title>"
    ));
    assert!(index.contains(r#""@type":"RoofingContractor""#));
    assert!(index.contains(
        r#""aggregateRating":{"@type":"AggregateRating","ratingValue":"5.0","reviewCount":1}"#
    ));
    assert!(!index.contains("Old title"));
    assert!(index.contains(r#"<link rel="canonical" href="https://woodsroofing.example/">"#));

    // No template, so the page is skipped rather than created.
    assert!(matches!(
        store.read("reviews.html").await,
        Err(StoreError::NotFound { .. })
    ));

    assert_eq!(
        report.artifacts,
        vec![
            "services/roof-repair.json".to_string(),
            "blog/spring-roof-check.json".to_string()
        ]
    );
    let artifact: Value =
        serde_json::from_str(&store.read("blog/spring-roof-check.json").await.unwrap()).unwrap();
    assert_eq!(artifact["id"], "post-1");
    assert_eq!(artifact["bodyHtml"], "<p>Body of post-1</p>");
}

#[tokio::test]
async fn rebuilding_unchanged_content_is_stable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = seeded_store(dir.path()).await;
    let pipeline = pipeline(fixture_source(&[]), store.clone());

    pipeline.build().await.expect("first build");
    let first = store.read("index.html").await.unwrap();
    pipeline.build().await.expect("second build");
    let second = store.read("index.html").await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn unavailable_database_leaves_its_listing_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = seeded_store(dir.path()).await;
    let pipeline = pipeline(fixture_source(&["services"]), store.clone());

    let report = pipeline.build().await.expect("build succeeds");
    assert_eq!(report.services, 0);

    let services = store.read("service.html").await.unwrap();
    assert_eq!(services, SERVICES_TEMPLATE);

    let blogs = store.read("blogs.html").await.unwrap();
    assert!(blogs.contains("Spring Roof Check"));
}

/// Store whose writes always fail.
struct ReadOnlyStore(FsDocumentStore);

#[async_trait]
impl DocumentStore for ReadOnlyStore {
    async fn read(&self, name: &str) -> Result<String, StoreError> {
        self.0.read(name).await
    }

    async fn write(&self, name: &str, _contents: &str) -> Result<(), StoreError> {
        Err(StoreError::Io {
            name: name.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

#[tokio::test]
async fn persist_failure_aborts_the_build() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = seeded_store(dir.path()).await;
    let fetcher = ContentFetcher::new(Arc::new(fixture_source(&[])), databases());
    let pipeline = SitePipeline::new(
        fetcher,
        TemplateMerger::new(Arc::new(ReadOnlyStore(store))),
        site(),
    );

    let err = pipeline.build().await.expect_err("write fails");
    assert!(matches!(err, BuildError::Persist(StoreError::Io { .. })));
}
