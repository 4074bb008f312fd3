//! Listing markup for each record type, shaped to the site's existing
//! templates, plus the insertion points those listings target.

use crate::domain::records::{BlogPost, Service, Testimonial};

use super::html::{attribute_text, escape_attribute, query_value};
use super::types::{InsertionPoint, RenderedFragment};

pub const BLOG_LIST: InsertionPoint =
    InsertionPoint::new("blog-list", ".w-dyn-items").with_empty_state(".w-dyn-empty");
pub const SERVICE_LIST: InsertionPoint = InsertionPoint::new("service-list", ".service-list");
pub const REVIEW_LIST: InsertionPoint =
    InsertionPoint::new("review-list", ".testimonials-wrapper, .reviews-list");
pub const HOME_SERVICES: InsertionPoint =
    InsertionPoint::new("home-services", ".service-list.w-dyn-items")
        .with_empty_state(".service-section .w-dyn-empty");
pub const HOME_TESTIMONIALS: InsertionPoint = InsertionPoint::new(
    "home-testimonials",
    ".testimonial-section .w-dyn-items, .review-section .w-dyn-items",
)
.with_empty_state(".testimonial-section .w-dyn-empty, .review-section .w-dyn-empty");

pub const BLOG_LIST_LIMIT: usize = 6;
pub const REVIEW_LIST_LIMIT: usize = 9;
pub const HOME_TESTIMONIAL_LIMIT: usize = 3;

const MAX_RATING: u8 = 5;

pub fn blog_list(posts: &[BlogPost]) -> RenderedFragment {
    let html: String = posts
        .iter()
        .filter(|post| post.published)
        .take(BLOG_LIST_LIMIT)
        .map(blog_card)
        .collect();
    RenderedFragment::new(BLOG_LIST, html)
}

pub fn service_list(services: &[Service]) -> RenderedFragment {
    let html: String = services
        .iter()
        .enumerate()
        .map(|(index, service)| service_card(service, index + 1))
        .collect();
    RenderedFragment::new(SERVICE_LIST, html)
}

pub fn review_list(testimonials: &[Testimonial]) -> RenderedFragment {
    let html: String = testimonials
        .iter()
        .take(REVIEW_LIST_LIMIT)
        .map(testimonial_card)
        .collect();
    RenderedFragment::new(REVIEW_LIST, html)
}

pub fn home_services(services: &[Service]) -> RenderedFragment {
    let html: String = services
        .iter()
        .enumerate()
        .map(|(index, service)| home_service_card(service, index + 1))
        .collect();
    RenderedFragment::new(HOME_SERVICES, html)
}

pub fn home_testimonials(testimonials: &[Testimonial]) -> RenderedFragment {
    let html: String = testimonials
        .iter()
        .take(HOME_TESTIMONIAL_LIMIT)
        .map(home_testimonial_card)
        .collect();
    RenderedFragment::new(HOME_TESTIMONIALS, html)
}

fn blog_card(post: &BlogPost) -> String {
    let href = format!("detail_blogs.html?id={}", query_value(&post.slug));
    format!(
        "<div role=\"listitem\" class=\"w-dyn-item\">\
<div class=\"single-blog style-02\">\
<a href=\"{href}\" class=\"blog-thumbnail-wrapper style-02 w-inline-block\">\
<img src=\"{image}\" loading=\"lazy\" alt=\"{alt}\" class=\"blog-thumbnail\"></a>\
<div class=\"blog-content style-02\"><div class=\"blog-top-content\">\
<p class=\"blog-label\">{category}</p>\
<div class=\"blog-title-wrapper\">\
<a href=\"{href}\" class=\"w-inline-block\"><h4 class=\"blog-title style-02\">{title}</h4></a>\
<p class=\"blog-excerpt\">{excerpt}</p>\
</div></div>\
<a href=\"{href}\" class=\"button-style-01 w-button\">Read full story</a>\
</div></div></div>",
        image = escape_attribute(&post.image_url),
        alt = attribute_text(&post.title),
        category = post.category,
        title = post.title,
        excerpt = post.excerpt,
    )
}

fn service_card(service: &Service, number: usize) -> String {
    format!(
        "<div class=\"single-service\"><div class=\"service-top\">\
<p class=\"service-number\">{number:02}</p>\
<div class=\"service-title-wrapper\">\
<h4 class=\"service-title\">{title}</h4>\
<p class=\"service-excerpt\">{excerpt}</p>\
</div></div>\
<a href=\"detail_service.html?id={slug}\" class=\"service-button w-button\">View more</a>\
<img src=\"{icon}\" loading=\"lazy\" alt=\"{alt}\" class=\"service-hover-image\">\
</div>",
        title = service.title,
        excerpt = service.short_description,
        slug = query_value(&service.slug),
        icon = escape_attribute(&service.icon),
        alt = attribute_text(&service.title),
    )
}

fn home_service_card(service: &Service, number: usize) -> String {
    format!(
        "<div role=\"listitem\" class=\"w-dyn-item\">{}</div>",
        service_card(service, number)
    )
}

fn star_text(rating: u8) -> String {
    let rating = rating.min(MAX_RATING);
    let mut stars = "★".repeat(rating.into());
    stars.push_str(&"☆".repeat((MAX_RATING - rating).into()));
    stars
}

fn testimonial_card(testimonial: &Testimonial) -> String {
    format!(
        "<div class=\"single-testimonial\"><div class=\"testimonial-content-wrapper\">\
<div class=\"testimonial-profile\">\
<img src=\"{image}\" loading=\"lazy\" alt=\"{alt}\" class=\"testimonial-image\">\
<div class=\"testimonial-profile-content\">\
<p class=\"testimonial-name\">{name}</p>\
<div class=\"testimonial-rating\">{stars}</div>\
<p class=\"testimonial-location\">{location}</p>\
</div></div>\
<p class=\"testimonial-content\">{content}</p>\
</div></div>",
        image = escape_attribute(&testimonial.image),
        alt = attribute_text(&testimonial.name),
        name = testimonial.name,
        stars = star_text(testimonial.rating),
        location = testimonial.location,
        content = testimonial.content,
    )
}

fn home_testimonial_card(testimonial: &Testimonial) -> String {
    let stars = "<img src=\"images/star-1-3.svg\" loading=\"lazy\" alt=\"Star\" class=\"review-star\">"
        .repeat(testimonial.rating.min(MAX_RATING).into());
    format!(
        "<div role=\"listitem\" class=\"w-dyn-item\"><div class=\"single-review style-02\">\
<div class=\"review-top\"><div class=\"review-rating\">{stars}</div>\
<p class=\"review-content\">\"{content}\"</p></div>\
<div class=\"reviewer-info\"><div class=\"reviewer-details\">\
<p class=\"reviewer-name\">{name}</p>\
<p class=\"reviewer-designation\">{location}</p>\
</div></div></div></div>",
        content = testimonial.content,
        name = testimonial.name,
        location = testimonial.location,
    )
}
