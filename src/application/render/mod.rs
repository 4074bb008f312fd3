//! HTML rendering for CMS content.
//!
//! Everything here is pure: given the same records and blocks the renderers
//! return byte-identical markup. Fetching and persistence happen in the
//! caller, typically a [`SitePipeline`](crate::application::pipeline::SitePipeline)
//! run.

mod blocks;
pub mod fragments;
mod html;
mod rich_text;
mod types;

pub use blocks::{render_block_values, render_blocks};
pub(crate) use html::escape_attribute;
pub use rich_text::{render_rich_text, render_rich_text_value};
pub use types::{InsertionPoint, RenderedFragment};
