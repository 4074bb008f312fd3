use async_trait::async_trait;

use crate::application::pipeline::{BuildError, SitePipeline};

use super::state::RebuildRequest;

/// The unit of work the coordinator serializes.
#[async_trait]
pub trait BuildRunner: Send + Sync + 'static {
    /// Run one build covering every request in `batch`.
    async fn run(&self, batch: &[RebuildRequest]) -> Result<(), BuildError>;
}

#[async_trait]
impl BuildRunner for SitePipeline {
    async fn run(&self, _batch: &[RebuildRequest]) -> Result<(), BuildError> {
        self.build().await.map(|_| ())
    }
}
