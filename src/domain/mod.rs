//! Domain layer types and invariants.

pub mod content;
pub mod defaults;
pub mod error;
pub mod records;
pub mod slug;
