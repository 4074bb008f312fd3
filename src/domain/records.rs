//! Typed content records produced by the fetcher and consumed by the
//! rendering pipeline.

use serde::Serialize;

use super::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub category: String,
    pub image_url: String,
    pub published: bool,
    pub slug: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub title: String,
    pub description: String,
    pub short_description: String,
    pub icon: String,
    pub image: String,
    pub category: String,
    pub price: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: String,
    pub name: String,
    pub content: String,
    /// Always within `1..=5`.
    pub rating: u8,
    pub location: String,
    pub service: String,
    pub image: String,
    pub date: String,
}

/// Any record the pipeline publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ContentRecord {
    BlogPost(BlogPost),
    Service(Service),
    Testimonial(Testimonial),
}

impl ContentRecord {
    pub fn id(&self) -> &str {
        match self {
            ContentRecord::BlogPost(post) => &post.id,
            ContentRecord::Service(service) => &service.id,
            ContentRecord::Testimonial(testimonial) => &testimonial.id,
        }
    }
}

/// Contact form submission written back to the CMS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ContactSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
}

impl ContactSubmission {
    /// A submission must leave some way to reach the sender.
    pub fn validate(&self) -> Result<(), DomainError> {
        let has_value = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|value| !value.trim().is_empty())
        };

        if !has_value(&self.email) && !has_value(&self.phone) {
            return Err(DomainError::validation(
                "contact submission requires an email or phone number",
            ));
        }

        Ok(())
    }
}
