use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    middleware,
    routing::{get, post},
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, info};

use crate::{
    application::{
        error::{ApiMessage, HttpError},
        fetcher::ContentFetcher,
    },
    domain::records::ContactSubmission,
    rebuild::{BuildStatus, RebuildCoordinator, TriggerOutcome},
};

use super::{
    middleware::{log_responses, set_request_context},
    webhook::{self, SIGNATURE_HEADER},
};

const WEBHOOK_REASON: &str = "Notion content updated";
const MANUAL_REASON: &str = "Manual rebuild requested";

#[derive(Clone)]
pub struct HttpState {
    pub coordinator: RebuildCoordinator,
    pub fetcher: ContentFetcher,
    /// When set, webhooks must carry a valid signature.
    pub webhook_secret: Option<Arc<str>>,
    pub site_name: Arc<str>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/webhook/notion", post(notion_webhook))
        .route("/rebuild", post(manual_rebuild))
        .route("/status", get(build_status))
        .route("/api/health", get(health))
        .route("/submit-contact", post(submit_contact))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn notion_webhook(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiMessage>, HttpError> {
    const SOURCE: &str = "infra::http::public::notion_webhook";

    if let Some(secret) = state.webhook_secret.as_deref() {
        let header = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok());
        webhook::verify(secret, &body, header).map_err(|err| {
            HttpError::from_error(
                SOURCE,
                StatusCode::UNAUTHORIZED,
                "Invalid webhook signature",
                &err,
            )
        })?;
    }

    info!(
        target = "sitesync::http::webhook",
        bytes = body.len(),
        "Notion webhook received"
    );
    log_trigger(state.coordinator.trigger(WEBHOOK_REASON));

    Ok(Json(ApiMessage::ok("Webhook processed, site rebuilding...")))
}

async fn manual_rebuild(State(state): State<HttpState>) -> Json<ApiMessage> {
    log_trigger(state.coordinator.trigger(MANUAL_REASON));
    Json(ApiMessage::ok("Manual rebuild triggered"))
}

async fn build_status(State(state): State<HttpState>) -> Json<BuildStatus> {
    Json(state.coordinator.status())
}

#[derive(Debug, Serialize)]
struct HealthView {
    status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    site: String,
    webhook: &'static str,
}

async fn health(State(state): State<HttpState>) -> Json<HealthView> {
    Json(HealthView {
        status: "healthy",
        timestamp: OffsetDateTime::now_utc(),
        site: state.site_name.to_string(),
        webhook: if state.webhook_secret.is_some() {
            "signed"
        } else {
            "enabled"
        },
    })
}

async fn submit_contact(
    State(state): State<HttpState>,
    payload: Result<Json<ContactSubmission>, JsonRejection>,
) -> Result<Json<ApiMessage>, HttpError> {
    const SOURCE: &str = "infra::http::public::submit_contact";

    let Json(submission) = payload.map_err(|rejection| {
        HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid contact submission",
            rejection.body_text(),
        )
    })?;

    submission.validate().map_err(|err| {
        HttpError::from_error(
            SOURCE,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Please provide an email address or phone number so we can reach you.",
            &err,
        )
    })?;

    match state.fetcher.save_contact(&submission).await {
        Ok(_) => {
            let message = format!(
                "Thank you for contacting {}! We will get back to you soon.",
                state.site_name
            );
            Ok(Json(ApiMessage::ok(message)))
        }
        Err(err) => {
            error!(
                target = "sitesync::http::contact",
                error = %err,
                "failed to store contact submission"
            );
            Err(HttpError::from_error(
                SOURCE,
                StatusCode::BAD_GATEWAY,
                "Sorry, there was an error submitting your request. Please call us directly.",
                &err,
            ))
        }
    }
}

fn log_trigger(outcome: TriggerOutcome) {
    match outcome {
        TriggerOutcome::Started => {
            info!(target = "sitesync::http::rebuild", "rebuild started");
        }
        TriggerOutcome::Queued { position } => {
            info!(
                target = "sitesync::http::rebuild",
                position, "build in progress, request queued"
            );
        }
    }
}
