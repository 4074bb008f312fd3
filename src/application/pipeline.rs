//! One complete site build: fetch content, render listings, merge them into
//! the page templates, refresh search metadata, and write per-record detail
//! artifacts.

use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::records::{BlogPost, Service, Testimonial};
use crate::domain::slug::ArtifactSlugger;

use super::fetcher::ContentFetcher;
use super::merge::{MergeError, MergeSkip, TemplateMerger};
use super::render::{RenderedFragment, fragments};
use super::repos::StoreError;
use super::seo::{SeoPage, SiteProfile, apply_seo};

pub const BLOGS_PAGE: &str = "blogs.html";
pub const SERVICES_PAGE: &str = "service.html";
pub const REVIEWS_PAGE: &str = "reviews.html";
pub const HOME_PAGE: &str = "index.html";

pub const SERVICE_ARTIFACT_DIR: &str = "services";
pub const BLOG_ARTIFACT_DIR: &str = "blog";

const BODY_FETCH_CONCURRENCY: usize = 3;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to persist build output: {0}")]
    Persist(#[from] StoreError),
    #[error("failed to rewrite `{document}`: {message}")]
    Rewrite { document: String, message: String },
    #[error("failed to encode artifact `{name}`: {source}")]
    Artifact {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl BuildError {
    fn from_merge(document: &str, err: MergeError) -> Self {
        match err {
            MergeError::Store(err) => Self::Persist(err),
            MergeError::Rewrite { message } => Self::Rewrite {
                document: document.to_string(),
                message,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub document: String,
    pub applied: Vec<&'static str>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub posts: usize,
    pub services: usize,
    pub testimonials: usize,
    pub pages: Vec<PageReport>,
    pub artifacts: Vec<String>,
    pub elapsed_ms: u64,
}

/// Record plus its rendered body, as written to `<dir>/<slug>.json`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailArtifact<'a, T: Serialize> {
    #[serde(flatten)]
    record: &'a T,
    body_html: String,
}

struct PagePlan {
    document: &'static str,
    fragments: Vec<RenderedFragment>,
    seo: Option<SeoPage>,
}

#[derive(Clone)]
pub struct SitePipeline {
    fetcher: ContentFetcher,
    merger: TemplateMerger,
    site: SiteProfile,
}

impl SitePipeline {
    pub fn new(fetcher: ContentFetcher, merger: TemplateMerger, site: SiteProfile) -> Self {
        Self {
            fetcher,
            merger,
            site,
        }
    }

    pub fn fetcher(&self) -> &ContentFetcher {
        &self.fetcher
    }

    /// Run one build. Content problems only shrink the output; a failed
    /// write aborts the build.
    pub async fn build(&self) -> Result<BuildReport, BuildError> {
        let started = Instant::now();

        let (mut posts, mut services, testimonials) = tokio::join!(
            self.fetcher.blog_posts(),
            self.fetcher.services(),
            self.fetcher.testimonials(),
        );
        assign_slugs(posts.iter_mut().map(|post| (&mut post.slug, post.id.as_str())));
        assign_slugs(
            services
                .iter_mut()
                .map(|service| (&mut service.slug, service.id.as_str())),
        );

        let mut report = BuildReport {
            posts: posts.len(),
            services: services.len(),
            testimonials: testimonials.len(),
            ..BuildReport::default()
        };

        for plan in self.page_plans(&posts, &services, &testimonials) {
            if let Some(page) = self.publish_page(plan).await? {
                report.pages.push(page);
            }
        }

        report.artifacts = self.write_artifacts(&posts, &services).await?;
        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            target = "sitesync::application::pipeline",
            posts = report.posts,
            services = report.services,
            testimonials = report.testimonials,
            pages = report.pages.len(),
            artifacts = report.artifacts.len(),
            elapsed_ms = report.elapsed_ms,
            "Site build finished"
        );

        Ok(report)
    }

    fn page_plans(
        &self,
        posts: &[BlogPost],
        services: &[Service],
        testimonials: &[Testimonial],
    ) -> Vec<PagePlan> {
        let home = SeoPage::home(&self.site, testimonials);

        vec![
            PagePlan {
                document: BLOGS_PAGE,
                fragments: vec![fragments::blog_list(posts)],
                seo: None,
            },
            PagePlan {
                document: SERVICES_PAGE,
                fragments: vec![fragments::service_list(services)],
                seo: None,
            },
            PagePlan {
                document: REVIEWS_PAGE,
                fragments: vec![fragments::review_list(testimonials)],
                seo: None,
            },
            PagePlan {
                document: HOME_PAGE,
                fragments: vec![
                    fragments::home_services(services),
                    fragments::home_testimonials(testimonials),
                ],
                seo: Some(home),
            },
        ]
    }

    async fn publish_page(&self, plan: PagePlan) -> Result<Option<PageReport>, BuildError> {
        let PagePlan {
            document,
            fragments,
            seo,
        } = plan;
        let fragments: Vec<RenderedFragment> = fragments
            .into_iter()
            .filter(|fragment| !fragment.is_empty())
            .collect();

        if fragments.is_empty() && seo.is_none() {
            info!(
                target = "sitesync::application::pipeline",
                document,
                "No content for page, leaving it untouched"
            );
            return Ok(None);
        }

        let site = &self.site;
        let result = self
            .merger
            .merge_document_with(document, &fragments, |html| match &seo {
                Some(page) => apply_seo(&html, site, page).map_err(|err| MergeError::Rewrite {
                    message: err.to_string(),
                }),
                None => Ok(html),
            })
            .await;

        match result {
            Ok(outcome) => Ok(Some(PageReport {
                document: document.to_string(),
                applied: outcome.applied,
                skipped: outcome.skipped.iter().map(MergeSkip::to_string).collect(),
            })),
            Err(MergeError::Store(StoreError::NotFound { name })) => {
                warn!(
                    target = "sitesync::application::pipeline",
                    document = name.as_str(),
                    "Template not found, skipping page"
                );
                Ok(None)
            }
            Err(err) => Err(BuildError::from_merge(document, err)),
        }
    }

    async fn write_artifacts(
        &self,
        posts: &[BlogPost],
        services: &[Service],
    ) -> Result<Vec<String>, BuildError> {
        let mut written = Vec::new();

        let service_bodies = self
            .bodies(services.iter().map(|service| service.id.clone()).collect())
            .await;
        for (service, body_html) in services.iter().zip(service_bodies) {
            let name = format!("{SERVICE_ARTIFACT_DIR}/{}.json", service.slug);
            self.write_artifact(&name, service, body_html).await?;
            written.push(name);
        }

        let published: Vec<&BlogPost> = posts.iter().filter(|post| post.published).collect();
        let post_bodies = self
            .bodies(published.iter().map(|post| post.id.clone()).collect())
            .await;
        for (post, body_html) in published.into_iter().zip(post_bodies) {
            let name = format!("{BLOG_ARTIFACT_DIR}/{}.json", post.slug);
            self.write_artifact(&name, post, body_html).await?;
            written.push(name);
        }

        Ok(written)
    }

    async fn bodies(&self, ids: Vec<String>) -> Vec<String> {
        stream::iter(ids)
            .map(|id| async move { self.fetcher.page_body(&id).await })
            .buffered(BODY_FETCH_CONCURRENCY)
            .collect()
            .await
    }

    async fn write_artifact<T: Serialize>(
        &self,
        name: &str,
        record: &T,
        body_html: String,
    ) -> Result<(), BuildError> {
        let artifact = DetailArtifact { record, body_html };
        let json = serde_json::to_string_pretty(&artifact).map_err(|source| BuildError::Artifact {
            name: name.to_string(),
            source,
        })?;
        self.merger.store().write(name, &json).await?;
        Ok(())
    }
}

/// Replace free-text slugs with unique, filesystem-safe ones so listing
/// links and artifact names agree.
fn assign_slugs<'a>(records: impl Iterator<Item = (&'a mut String, &'a str)>) {
    let mut slugger = ArtifactSlugger::new();
    for (slug, id) in records {
        match slugger.slug_for(slug, id) {
            Ok(normalised) => *slug = normalised,
            Err(err) => {
                warn!(
                    target = "sitesync::application::pipeline",
                    record_id = id,
                    error = %err,
                    "Falling back to record id as slug"
                );
                *slug = slugger.fallback(id);
            }
        }
    }
}
