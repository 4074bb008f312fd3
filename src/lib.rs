//! Sitesync keeps a static website in step with a Notion workspace.
//!
//! Content is pulled from CMS databases, rendered to HTML fragments, and
//! merged into the site's existing pages. Rebuilds are requested over HTTP
//! and serialized by [`rebuild::RebuildCoordinator`].

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod rebuild;
