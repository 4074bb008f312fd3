//! Rebuild requests and the coordinator's lock-guarded state.

use serde::Serialize;
use time::OffsetDateTime;

/// Why a build was asked for, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildRequest {
    pub reason: String,
    pub requested_at: OffsetDateTime,
}

impl RebuildRequest {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            requested_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Single reason describing a batch of coalesced requests.
pub fn summarize(requests: &[RebuildRequest]) -> String {
    match requests {
        [] => String::new(),
        [single] => single.reason.clone(),
        many => {
            let reasons: Vec<&str> = many.iter().map(|request| request.reason.as_str()).collect();
            format!("{} coalesced triggers: {}", many.len(), reasons.join("; "))
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct BuildState {
    /// A build is running right now.
    pub(crate) is_building: bool,
    /// A worker task owns the build loop (running, or waiting to run the
    /// follow-up).
    pub(crate) worker_active: bool,
    pub(crate) pending: Vec<RebuildRequest>,
}

/// Snapshot returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    pub is_building: bool,
    pub queued_count: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// What happened to a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    /// Held for the follow-up build, at this 1-based queue position.
    Queued { position: usize },
}
