//! Typed access to the CMS databases.
//!
//! Every raw record passes through one of the `map_*` functions below, which
//! always return a fully populated record: anything missing from the source
//! falls back to [`RecordDefaults`].

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::domain::content::file_url;
use crate::domain::defaults::RecordDefaults;
use crate::domain::records::{BlogPost, ContactSubmission, Service, Testimonial};

use super::render::{render_block_values, render_rich_text_value};
use super::repos::{
    ContentSource, PropertyMap, PropertyValue, QueryFilter, QuerySort, QuerySpec, RawRecord,
    SourceError,
};

/// Database identifiers for each record type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDatabases {
    pub blogs: String,
    pub services: String,
    pub testimonials: String,
    pub contact: String,
}

#[derive(Clone)]
pub struct ContentFetcher {
    source: Arc<dyn ContentSource>,
    databases: ContentDatabases,
    defaults: RecordDefaults,
}

impl ContentFetcher {
    pub fn new(source: Arc<dyn ContentSource>, databases: ContentDatabases) -> Self {
        Self {
            source,
            databases,
            defaults: RecordDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: RecordDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn blog_query(&self) -> QuerySpec {
        QuerySpec::new(&self.databases.blogs).sort(QuerySort::descending("Created"))
    }

    pub fn service_query(&self) -> QuerySpec {
        QuerySpec::new(&self.databases.services).filter(QueryFilter::checked("Active"))
    }

    pub fn testimonial_query(&self) -> QuerySpec {
        QuerySpec::new(&self.databases.testimonials)
            .filter(QueryFilter::checked("Approved"))
            .sort(QuerySort::descending("Rating"))
    }

    /// All blog posts, newest first. Source failures yield an empty list.
    pub async fn blog_posts(&self) -> Vec<BlogPost> {
        let records = self.fetch("blog_posts", self.blog_query()).await;
        records
            .iter()
            .map(|record| map_blog_post(record, &self.defaults))
            .collect()
    }

    /// Active services. Source failures yield an empty list.
    pub async fn services(&self) -> Vec<Service> {
        let records = self.fetch("services", self.service_query()).await;
        records
            .iter()
            .map(|record| map_service(record, &self.defaults))
            .collect()
    }

    /// Approved testimonials, highest rating first. Source failures yield an
    /// empty list.
    pub async fn testimonials(&self) -> Vec<Testimonial> {
        let records = self.fetch("testimonials", self.testimonial_query()).await;
        records
            .iter()
            .map(|record| map_testimonial(record, &self.defaults))
            .collect()
    }

    /// Body of a record rendered to HTML, or `""` if it cannot be fetched.
    pub async fn page_body(&self, record_id: &str) -> String {
        match self.source.block_children(record_id).await {
            Ok(blocks) => render_block_values(&blocks),
            Err(err) => {
                error!(
                    target = "sitesync::application::fetcher",
                    record_id,
                    error = %err,
                    "Failed to fetch page body"
                );
                String::new()
            }
        }
    }

    /// Store a contact submission, returning the id of the created record.
    pub async fn save_contact(&self, submission: &ContactSubmission) -> Result<String, SourceError> {
        let properties = contact_properties(submission, &self.defaults);
        let id = self
            .source
            .create_record(&self.databases.contact, properties)
            .await?;
        info!(
            target = "sitesync::application::fetcher",
            record_id = id.as_str(),
            "Contact submission saved"
        );
        Ok(id)
    }

    async fn fetch(&self, kind: &'static str, spec: QuerySpec) -> Vec<RawRecord> {
        match self.source.query(&spec).await {
            Ok(records) => {
                debug!(
                    target = "sitesync::application::fetcher",
                    kind,
                    count = records.len(),
                    "Fetched records"
                );
                records
            }
            Err(err) => {
                error!(
                    target = "sitesync::application::fetcher",
                    kind,
                    database_id = spec.database_id.as_str(),
                    error = %err,
                    "Content source unavailable, continuing with no records"
                );
                Vec::new()
            }
        }
    }
}

fn rich_text(record: &RawRecord, property: &str, field: &str) -> String {
    record
        .property(property)
        .and_then(|value| value.get(field))
        .map(render_rich_text_value)
        .unwrap_or_default()
}

fn first_plain_text(record: &RawRecord, property: &str) -> Option<String> {
    record
        .property(property)?
        .pointer("/rich_text/0/plain_text")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn select_name(record: &RawRecord, property: &str) -> Option<String> {
    record
        .property(property)?
        .pointer("/select/name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn first_file(record: &RawRecord, property: &str) -> Option<String> {
    record
        .property(property)?
        .pointer("/files/0")
        .and_then(file_url)
}

fn checkbox(record: &RawRecord, property: &str) -> Option<bool> {
    record.property(property)?.get("checkbox")?.as_bool()
}

fn date_start(record: &RawRecord, property: &str) -> Option<String> {
    record
        .property(property)?
        .pointer("/date/start")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Ratings outside `1..=5` are clamped; a missing or zero rating takes the
/// default.
fn rating(record: &RawRecord, default: u8) -> u8 {
    let value = record
        .property("Rating")
        .and_then(|value| value.get("number"))
        .and_then(Value::as_f64)
        .filter(|value| value.is_finite() && *value != 0.0);

    match value {
        Some(value) => value.round().clamp(1.0, 5.0) as u8,
        None => default.clamp(1, 5),
    }
}

pub fn map_blog_post(record: &RawRecord, defaults: &RecordDefaults) -> BlogPost {
    BlogPost {
        id: record.id.clone(),
        title: rich_text(record, "Title", "title"),
        excerpt: rich_text(record, "Excerpt", "rich_text"),
        category: select_name(record, "Category").unwrap_or_else(|| defaults.post_category.clone()),
        image_url: first_file(record, "Image").unwrap_or_else(|| defaults.post_image.clone()),
        published: checkbox(record, "Published").unwrap_or(defaults.post_published),
        slug: first_plain_text(record, "Slug").unwrap_or_else(|| record.id.clone()),
        created_at: record.created_time.clone().unwrap_or_default(),
    }
}

pub fn map_service(record: &RawRecord, defaults: &RecordDefaults) -> Service {
    Service {
        id: record.id.clone(),
        title: rich_text(record, "Title", "title"),
        description: rich_text(record, "Description", "rich_text"),
        short_description: rich_text(record, "ShortDescription", "rich_text"),
        icon: first_file(record, "Icon").unwrap_or_else(|| defaults.service_icon.clone()),
        image: first_file(record, "Image").unwrap_or_else(|| defaults.service_image.clone()),
        category: select_name(record, "Category")
            .unwrap_or_else(|| defaults.service_category.clone()),
        price: first_plain_text(record, "Price").unwrap_or_else(|| defaults.service_price.clone()),
        slug: first_plain_text(record, "Slug").unwrap_or_else(|| record.id.clone()),
    }
}

pub fn map_testimonial(record: &RawRecord, defaults: &RecordDefaults) -> Testimonial {
    Testimonial {
        id: record.id.clone(),
        name: rich_text(record, "Name", "title"),
        content: rich_text(record, "Review", "rich_text"),
        rating: rating(record, defaults.testimonial_rating),
        location: rich_text(record, "Location", "rich_text"),
        service: select_name(record, "Service")
            .unwrap_or_else(|| defaults.testimonial_service.clone()),
        image: first_file(record, "Photo").unwrap_or_else(|| defaults.testimonial_image.clone()),
        date: date_start(record, "Date")
            .or_else(|| record.created_time.clone())
            .unwrap_or_default(),
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn contact_properties(submission: &ContactSubmission, defaults: &RecordDefaults) -> PropertyMap {
    let mut properties = PropertyMap::new();
    properties.insert(
        "Name".to_string(),
        PropertyValue::Title(
            non_blank(&submission.name).unwrap_or_else(|| defaults.contact_name.clone()),
        ),
    );
    properties.insert(
        "Email".to_string(),
        PropertyValue::Email(non_blank(&submission.email)),
    );
    properties.insert(
        "Phone".to_string(),
        PropertyValue::Phone(non_blank(&submission.phone)),
    );
    properties.insert(
        "Message".to_string(),
        PropertyValue::RichText(
            non_blank(&submission.message).unwrap_or_else(|| defaults.contact_message.clone()),
        ),
    );
    properties.insert(
        "Source".to_string(),
        PropertyValue::Select(
            non_blank(&submission.source).unwrap_or_else(|| defaults.contact_source.clone()),
        ),
    );
    properties.insert(
        "Status".to_string(),
        PropertyValue::Select(defaults.contact_status.clone()),
    );
    properties
}
