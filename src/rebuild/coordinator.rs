//! Serializes site builds.
//!
//! At most one build runs at a time. Triggers that arrive while a build is
//! running are held, and once it finishes they are folded into exactly one
//! follow-up build that starts after the coalescing delay. Triggers that
//! arrive during that delay join the same follow-up.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::lock::mutex_lock;
use super::runner::BuildRunner;
use super::state::{BuildState, BuildStatus, RebuildRequest, TriggerOutcome, summarize};

const SOURCE: &str = "rebuild::coordinator";

const METRIC_BUILDS_TOTAL: &str = "sitesync_builds_total";
const METRIC_BUILD_MS: &str = "sitesync_build_ms";
const METRIC_TRIGGERS_COALESCED: &str = "sitesync_triggers_coalesced_total";
const METRIC_QUEUE_LEN: &str = "sitesync_rebuild_queue_len";

pub const DEFAULT_COALESCE_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct RebuildCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    runner: Arc<dyn BuildRunner>,
    coalesce_delay: Duration,
    state: Mutex<BuildState>,
    active: watch::Sender<bool>,
}

impl RebuildCoordinator {
    pub fn new(runner: Arc<dyn BuildRunner>, coalesce_delay: Duration) -> Self {
        let (active, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                runner,
                coalesce_delay,
                state: Mutex::new(BuildState::default()),
                active,
            }),
        }
    }

    /// Request a build. Never waits for the build itself.
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger(&self, reason: impl Into<String>) -> TriggerOutcome {
        let request = RebuildRequest::new(reason);
        let mut state = mutex_lock(&self.inner.state, SOURCE, "trigger");

        if state.worker_active {
            info!(
                target = "sitesync::rebuild",
                reason = request.reason.as_str(),
                is_building = state.is_building,
                "Build in progress, queueing trigger"
            );
            state.pending.push(request);
            gauge!(METRIC_QUEUE_LEN).set(state.pending.len() as f64);
            return TriggerOutcome::Queued {
                position: state.pending.len(),
            };
        }

        state.worker_active = true;
        state.is_building = true;
        self.inner.active.send_replace(true);
        drop(state);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            Worker::new(inner).run(vec![request]).await;
        });

        TriggerOutcome::Started
    }

    pub fn status(&self) -> BuildStatus {
        let state = mutex_lock(&self.inner.state, SOURCE, "status");
        BuildStatus {
            is_building: state.is_building,
            queued_count: state.pending.len(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Resolves once no build is running or scheduled.
    pub async fn wait_idle(&self) {
        let mut active = self.inner.active.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = active.wait_for(|active| !*active).await;
    }
}

/// Owns the build loop. Dropping it always leaves the coordinator idle,
/// even if the task is cancelled.
struct Worker {
    inner: Arc<Inner>,
    finished: bool,
}

impl Worker {
    fn new(inner: Arc<Inner>) -> Self {
        Self {
            inner,
            finished: false,
        }
    }

    async fn run(mut self, mut batch: Vec<RebuildRequest>) {
        loop {
            self.build(&batch).await;

            {
                let mut state = mutex_lock(&self.inner.state, SOURCE, "finish");
                state.is_building = false;
                if state.pending.is_empty() {
                    // Reset under the lock so a concurrent trigger sees a
                    // consistent idle state.
                    state.worker_active = false;
                    self.inner.active.send_replace(false);
                    self.finished = true;
                    return;
                }
            }

            tokio::time::sleep(self.inner.coalesce_delay).await;

            {
                let mut state = mutex_lock(&self.inner.state, SOURCE, "follow_up");
                batch = std::mem::take(&mut state.pending);
                state.is_building = true;
                gauge!(METRIC_QUEUE_LEN).set(0.0);
            }

            counter!(METRIC_TRIGGERS_COALESCED).increment(batch.len() as u64);
            info!(
                target = "sitesync::rebuild",
                coalesced = batch.len(),
                "Starting follow-up build"
            );
        }
    }

    async fn build(&self, batch: &[RebuildRequest]) {
        let reason = summarize(batch);
        let started_at = Instant::now();
        info!(
            target = "sitesync::rebuild",
            reason = reason.as_str(),
            "Build started"
        );

        // Separate task so a panicking build surfaces as a failed join.
        let runner = Arc::clone(&self.inner.runner);
        let owned = batch.to_vec();
        let outcome = tokio::spawn(async move { runner.run(&owned).await }).await;

        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
        histogram!(METRIC_BUILD_MS).record(elapsed_ms);

        match outcome {
            Ok(Ok(())) => {
                counter!(METRIC_BUILDS_TOTAL, "result" => "ok").increment(1);
                info!(
                    target = "sitesync::rebuild",
                    reason = reason.as_str(),
                    elapsed_ms,
                    "Build completed"
                );
            }
            Ok(Err(err)) => {
                counter!(METRIC_BUILDS_TOTAL, "result" => "error").increment(1);
                error!(
                    target = "sitesync::rebuild",
                    reason = reason.as_str(),
                    elapsed_ms,
                    error = %err,
                    "Build failed"
                );
            }
            Err(join_err) => {
                counter!(METRIC_BUILDS_TOTAL, "result" => "panic").increment(1);
                error!(
                    target = "sitesync::rebuild",
                    reason = reason.as_str(),
                    elapsed_ms,
                    error = %join_err,
                    "Build task aborted"
                );
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = mutex_lock(&self.inner.state, SOURCE, "worker_drop");
        warn!(
            target = "sitesync::rebuild",
            pending = state.pending.len(),
            "Build worker stopped early, resetting state"
        );
        state.is_building = false;
        state.worker_active = false;
        self.inner.active.send_replace(false);
    }
}
