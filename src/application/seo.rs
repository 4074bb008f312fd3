//! Search metadata for published pages.
//!
//! [`apply_seo`] strips every tag it manages from the document head and
//! appends a fresh set, so running it again on its own output is a no-op.

use lol_html::{RewriteStrSettings, element, html_content::ContentType, rewrite_str};
use serde::Serialize;
use thiserror::Error;

use crate::domain::records::Testimonial;

use super::render::escape_attribute;

const MANAGED_SELECTORS: [&str; 8] = [
    "title",
    "meta[name=\"description\"]",
    "meta[name=\"keywords\"]",
    "meta[name=\"robots\"]",
    "meta[property^=\"og:\"]",
    "meta[name^=\"twitter:\"]",
    "link[rel=\"canonical\"]",
    "script[type=\"application/ld+json\"]",
];

const ROBOTS: &str = "index, follow";
const TWITTER_CARD: &str = "summary_large_image";
const SCHEMA_CONTEXT: &str = "https://schema.org";
const DEFAULT_BUSINESS_TYPE: &str = "LocalBusiness";

#[derive(Debug, Error)]
#[error("failed to apply seo metadata: {message}")]
pub struct SeoError {
    message: String,
}

/// A question answered in the home page's FAQ structured data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

/// Site-wide metadata shared by every page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SiteProfile {
    pub site_name: String,
    pub site_url: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub default_image: String,
    /// schema.org type of the business, e.g. `RoofingContractor`.
    pub business_type: String,
    pub telephone: Option<String>,
    pub home_title: Option<String>,
    pub home_description: Option<String>,
    pub home_keywords: Vec<String>,
    pub faq: Vec<FaqEntry>,
}

impl SiteProfile {
    fn absolute(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.site_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    fn business_type(&self) -> &str {
        if self.business_type.trim().is_empty() {
            DEFAULT_BUSINESS_TYPE
        } else {
            &self.business_type
        }
    }
}

/// Mean testimonial rating, published as `aggregateRating`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub count: usize,
}

impl RatingSummary {
    pub fn from_testimonials(testimonials: &[Testimonial]) -> Option<Self> {
        if testimonials.is_empty() {
            return None;
        }
        let total: u32 = testimonials
            .iter()
            .map(|testimonial| u32::from(testimonial.rating))
            .sum();
        Some(Self {
            average: f64::from(total) / testimonials.len() as f64,
            count: testimonials.len(),
        })
    }
}

/// Per-page metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SeoPage {
    pub title: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    /// Site-relative path, e.g. `/blogs.html`.
    pub canonical: Option<String>,
    pub page_type: String,
    pub rating: Option<RatingSummary>,
    pub faq: Vec<FaqEntry>,
}

impl SeoPage {
    pub fn website(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            keywords: Vec::new(),
            canonical: None,
            page_type: "website".to_string(),
            rating: None,
            faq: Vec::new(),
        }
    }

    /// The home page: configured title, description and keywords, the
    /// testimonial rating and the site FAQ.
    pub fn home(site: &SiteProfile, testimonials: &[Testimonial]) -> Self {
        let title = site
            .home_title
            .clone()
            .unwrap_or_else(|| site.site_name.clone());
        Self {
            description: site.home_description.clone(),
            keywords: site.home_keywords.clone(),
            canonical: Some("/".to_string()),
            rating: RatingSummary::from_testimonials(testimonials),
            faq: site.faq.clone(),
            ..Self::website(title)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BusinessSchema<'a> {
    #[serde(rename = "@context")]
    context: &'static str,
    #[serde(rename = "@type")]
    kind: &'a str,
    name: &'a str,
    url: &'a str,
    description: &'a str,
    image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    telephone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aggregate_rating: Option<AggregateRatingSchema>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregateRatingSchema {
    #[serde(rename = "@type")]
    kind: &'static str,
    rating_value: String,
    review_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FaqPageSchema<'a> {
    #[serde(rename = "@context")]
    context: &'static str,
    #[serde(rename = "@type")]
    kind: &'static str,
    main_entity: Vec<QuestionSchema<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QuestionSchema<'a> {
    #[serde(rename = "@type")]
    kind: &'static str,
    name: &'a str,
    accepted_answer: AnswerSchema<'a>,
}

#[derive(Serialize)]
struct AnswerSchema<'a> {
    #[serde(rename = "@type")]
    kind: &'static str,
    text: &'a str,
}

fn push_meta(out: &mut String, attribute: &str, key: &str, content: &str) {
    out.push_str("<meta ");
    out.push_str(attribute);
    out.push_str("=\"");
    out.push_str(key);
    out.push_str("\" content=\"");
    out.push_str(&escape_attribute(content));
    out.push_str("\">");
}

fn push_json_ld<T: Serialize>(out: &mut String, schema: &T) -> Result<(), SeoError> {
    let json = serde_json::to_string(schema).map_err(|err| SeoError {
        message: err.to_string(),
    })?;
    out.push_str("<script type=\"application/ld+json\">");
    out.push_str(&json.replace("</", "<\\/"));
    out.push_str("</script>");
    Ok(())
}

/// The managed head markup for a page, with no whitespace between tags.
pub fn head_markup(site: &SiteProfile, page: &SeoPage) -> Result<String, SeoError> {
    let title = if page.title.contains(&site.site_name) {
        page.title.clone()
    } else {
        format!("{} | {}", page.title, site.site_name)
    };
    let description = page
        .description
        .as_deref()
        .filter(|description| !description.trim().is_empty())
        .unwrap_or(&site.description);
    let keywords = site
        .keywords
        .iter()
        .chain(page.keywords.iter())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let canonical = match page.canonical.as_deref() {
        Some(path) => site.absolute(path),
        None => site.site_url.clone(),
    };
    let image = site.absolute(&site.default_image);

    let mut out = String::new();
    out.push_str("<title>");
    out.push_str(&escape_attribute(&title));
    out.push_str("</title>");

    push_meta(&mut out, "name", "description", description);
    push_meta(&mut out, "name", "keywords", &keywords);
    push_meta(&mut out, "name", "robots", ROBOTS);

    push_meta(&mut out, "property", "og:title", &title);
    push_meta(&mut out, "property", "og:description", description);
    push_meta(&mut out, "property", "og:image", &image);
    push_meta(&mut out, "property", "og:url", &canonical);
    push_meta(&mut out, "property", "og:type", &page.page_type);
    push_meta(&mut out, "property", "og:site_name", &site.site_name);

    push_meta(&mut out, "name", "twitter:card", TWITTER_CARD);
    push_meta(&mut out, "name", "twitter:title", &title);
    push_meta(&mut out, "name", "twitter:description", description);
    push_meta(&mut out, "name", "twitter:image", &image);

    out.push_str("<link rel=\"canonical\" href=\"");
    out.push_str(&escape_attribute(&canonical));
    out.push_str("\">");

    let business = BusinessSchema {
        context: SCHEMA_CONTEXT,
        kind: site.business_type(),
        name: &site.site_name,
        url: &site.site_url,
        description: &site.description,
        image,
        telephone: site.telephone.as_deref(),
        aggregate_rating: page.rating.map(|rating| AggregateRatingSchema {
            kind: "AggregateRating",
            rating_value: format!("{:.1}", rating.average),
            review_count: rating.count,
        }),
    };
    push_json_ld(&mut out, &business)?;

    if !page.faq.is_empty() {
        let faq = FaqPageSchema {
            context: SCHEMA_CONTEXT,
            kind: "FAQPage",
            main_entity: page
                .faq
                .iter()
                .map(|entry| QuestionSchema {
                    kind: "Question",
                    name: &entry.question,
                    accepted_answer: AnswerSchema {
                        kind: "Answer",
                        text: &entry.answer,
                    },
                })
                .collect(),
        };
        push_json_ld(&mut out, &faq)?;
    }

    Ok(out)
}

/// Replace the managed head tags of `markup` with those for `page`.
pub fn apply_seo(markup: &str, site: &SiteProfile, page: &SeoPage) -> Result<String, SeoError> {
    let head = head_markup(site, page)?;

    let mut handlers = Vec::with_capacity(MANAGED_SELECTORS.len() + 1);
    for selector in MANAGED_SELECTORS {
        handlers.push(element!(selector, |el| {
            el.remove();
            Ok(())
        }));
    }
    handlers.push(element!("head", |el| {
        el.append(&head, ContentType::Html);
        Ok(())
    }));

    rewrite_str(
        markup,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| SeoError {
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteProfile {
        SiteProfile {
            site_name: "Woods Roofing".to_string(),
            site_url: "https://woods.example.com/".to_string(),
            description: "Roofing in Southwest Ohio".to_string(),
            keywords: vec!["roofing".to_string(), "gutters".to_string()],
            default_image: "/images/Hero-Image.png".to_string(),
            ..SiteProfile::default()
        }
    }

    fn testimonial(rating: u8) -> Testimonial {
        Testimonial {
            id: format!("t-{rating}"),
            name: "Pat".to_string(),
            content: "Great crew".to_string(),
            rating,
            location: String::new(),
            service: String::new(),
            image: String::new(),
            date: String::new(),
        }
    }

    const DOCUMENT: &str = "<html><head>\n<meta charset=\"utf-8\">\n<title>Old</title>\n\
<meta name=\"description\" content=\"old\">\n<meta property=\"og:title\" content=\"old\">\n\
<link rel=\"stylesheet\" href=\"/css/site.css\">\n</head><body><h1>Hi</h1></body></html>";

    #[test]
    fn replaces_managed_tags_and_keeps_others() {
        let mut page = SeoPage::website("Services");
        page.canonical = Some("/service.html".to_string());
        page.keywords = vec!["roof repair".to_string()];

        let html = apply_seo(DOCUMENT, &site(), &page).unwrap();

        assert_eq!(html.matches("<title>").count(), 1);
        assert!(html.contains("<title>Services | Woods Roofing</title>"));
        assert!(!html.contains("content=\"old\""));
        assert!(html.contains("<meta charset=\"utf-8\">"));
        assert!(html.contains("<link rel=\"stylesheet\" href=\"/css/site.css\">"));
        assert!(html.contains("content=\"roofing, gutters, roof repair\""));
        assert!(html.contains(
            "<link rel=\"canonical\" href=\"https://woods.example.com/service.html\">"
        ));
        assert!(html.contains(
            "<meta property=\"og:image\" content=\"https://woods.example.com/images/Hero-Image.png\">"
        ));
        assert!(html.contains("\"@type\":\"LocalBusiness\""));
        assert!(!html.contains("aggregateRating"));
        assert!(html.ends_with("</script></head><body><h1>Hi</h1></body></html>"));
    }

    #[test]
    fn applying_twice_is_stable() {
        let page = SeoPage::website("Home");
        let once = apply_seo(DOCUMENT, &site(), &page).unwrap();
        let twice = apply_seo(&once, &site(), &page).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn title_with_site_name_is_not_suffixed() {
        let head = head_markup(&site(), &SeoPage::website("Woods Roofing | Home")).unwrap();
        assert!(head.starts_with("<title>Woods Roofing | Home</title>"));
    }

    #[test]
    fn attribute_values_are_escaped() {
        let mut page = SeoPage::website("Roofs \"R\" Us");
        page.description = Some("<b>bold</b> & brash".to_string());
        let head = head_markup(&site(), &page).unwrap();
        assert!(head.contains("content=\"&lt;b&gt;bold&lt;/b&gt; &amp; brash\""));
        assert!(head.contains("<title>Roofs &quot;R&quot; Us | Woods Roofing</title>"));
    }

    #[test]
    fn blank_description_falls_back_to_site() {
        let mut page = SeoPage::website("Home");
        page.description = Some("   ".to_string());
        let head = head_markup(&site(), &page).unwrap();
        assert!(head.contains("<meta name=\"description\" content=\"Roofing in Southwest Ohio\">"));
    }

    #[test]
    fn home_page_uses_configured_copy() {
        let mut site = site();
        site.home_title = Some("Professional Roofing in Southwest Ohio".to_string());
        site.home_description = Some("Free estimates".to_string());
        site.home_keywords = vec!["roof replacement ohio".to_string()];

        let page = SeoPage::home(&site, &[]);
        assert_eq!(page.canonical.as_deref(), Some("/"));
        assert_eq!(page.rating, None);

        let head = head_markup(&site, &page).unwrap();
        assert!(head.starts_with(
            "<title>Professional Roofing in Southwest Ohio | Woods Roofing</title>"
        ));
        assert!(head.contains("<meta name=\"description\" content=\"Free estimates\">"));
        assert!(head.contains("content=\"roofing, gutters, roof replacement ohio\""));
        assert!(head.contains("<link rel=\"canonical\" href=\"https://woods.example.com/\">"));
    }

    #[test]
    fn home_page_title_defaults_to_site_name() {
        let page = SeoPage::home(&site(), &[]);
        assert_eq!(page.title, "Woods Roofing");
        assert!(page.faq.is_empty());
    }

    #[test]
    fn rating_summary_averages_testimonials() {
        let summary =
            RatingSummary::from_testimonials(&[testimonial(5), testimonial(4), testimonial(4)])
                .unwrap();
        assert_eq!(summary.count, 3);
        assert!((summary.average - 13.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(RatingSummary::from_testimonials(&[]), None);
    }

    #[test]
    fn business_schema_carries_rating_and_type() {
        let mut site = site();
        site.business_type = "RoofingContractor".to_string();
        site.telephone = Some("(513) 320-9436".to_string());
        let page = SeoPage::home(&site, &[testimonial(5), testimonial(4), testimonial(4)]);

        let head = head_markup(&site, &page).unwrap();
        assert!(head.contains("\"@type\":\"RoofingContractor\""));
        assert!(head.contains("\"telephone\":\"(513) 320-9436\""));
        assert!(head.contains(
            "\"aggregateRating\":{\"@type\":\"AggregateRating\",\"ratingValue\":\"4.3\",\"reviewCount\":3}"
        ));
        assert!(!head.contains("FAQPage"));
    }

    #[test]
    fn faq_is_emitted_as_its_own_schema() {
        let mut site = site();
        site.faq = vec![FaqEntry {
            question: "Do you provide free estimates?".to_string(),
            answer: "Yes, call us </script> anytime.".to_string(),
        }];
        let page = SeoPage::home(&site, &[]);

        let head = head_markup(&site, &page).unwrap();
        assert_eq!(head.matches("<script type=\"application/ld+json\">").count(), 2);
        assert!(head.contains("\"@type\":\"FAQPage\""));
        assert!(head.contains(
            "{\"@type\":\"Question\",\"name\":\"Do you provide free estimates?\",\"acceptedAnswer\":{\"@type\":\"Answer\",\"text\":\"Yes, call us <\\/script> anytime.\"}}"
        ));

        let once = apply_seo(DOCUMENT, &site, &page).unwrap();
        let twice = apply_seo(&once, &site, &page).unwrap();
        assert_eq!(once, twice);
    }
}
