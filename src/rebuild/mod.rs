//! Rebuild coordination.
//!
//! Every build request funnels into one [`RebuildCoordinator`], which owns
//! the only path to running a build.

mod coordinator;
mod lock;
mod runner;
mod state;

pub use coordinator::{DEFAULT_COALESCE_DELAY, RebuildCoordinator};
pub use runner::BuildRunner;
pub use state::{BuildStatus, RebuildRequest, TriggerOutcome, summarize};
