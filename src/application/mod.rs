//! Application services: content fetching, rendering, merging and the
//! build pipeline that ties them together.

pub mod error;
pub mod fetcher;
pub mod merge;
pub mod pipeline;
pub mod render;
pub mod repos;
pub mod seo;
