mod middleware;
mod public;
pub mod webhook;

pub use public::{HttpState, build_router};
