use std::{process, sync::Arc};

use sitesync::{
    application::{
        error::AppError,
        fetcher::ContentFetcher,
        merge::TemplateMerger,
        pipeline::SitePipeline,
        repos::{ContentSource, DocumentStore},
    },
    config::{self, FetchArgs, FetchKind},
    infra::{
        error::InfraError,
        http::{self, HttpState},
        notion::NotionClient,
        store::FsDocumentStore,
        telemetry,
    },
    rebuild::RebuildCoordinator,
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Build(_) => run_build(settings).await,
        config::Command::Fetch(args) => run_fetch(settings, args).await,
    }
}

fn content_fetcher(settings: &config::Settings) -> Result<ContentFetcher, AppError> {
    let notion = &settings.notion;
    let api_key = notion.api_key.as_deref().ok_or_else(|| {
        InfraError::configuration("notion.api_key is required (set SITESYNC__NOTION__API_KEY)")
    })?;
    let client = NotionClient::new(
        notion.api_base_url.clone(),
        api_key,
        &notion.version,
        notion.request_timeout,
    )?;
    let source: Arc<dyn ContentSource> = Arc::new(client);
    Ok(ContentFetcher::new(source, notion.databases.clone()))
}

fn site_pipeline(settings: &config::Settings) -> Result<SitePipeline, AppError> {
    let fetcher = content_fetcher(settings)?;
    let store: Arc<dyn DocumentStore> = Arc::new(FsDocumentStore::new(settings.site.root.clone()));
    Ok(SitePipeline::new(
        fetcher,
        TemplateMerger::new(store),
        settings.site.profile.clone(),
    ))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let pipeline = site_pipeline(&settings)?;
    let fetcher = pipeline.fetcher().clone();
    let coordinator = RebuildCoordinator::new(Arc::new(pipeline), settings.rebuild.coalesce_delay);

    let state = HttpState {
        coordinator: coordinator.clone(),
        fetcher,
        webhook_secret: settings.rebuild.webhook_secret.as_deref().map(Arc::from),
        site_name: Arc::from(settings.site.profile.site_name.as_str()),
    };
    if state.webhook_secret.is_none() {
        warn!(
            target = "sitesync::serve",
            "no webhook secret configured; unsigned webhooks will trigger rebuilds"
        );
    }

    if settings.rebuild.on_start {
        coordinator.trigger("Startup build");
    }

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "sitesync::serve",
        addr = %settings.server.addr,
        site_root = %settings.site.root.display(),
        "listening"
    );

    axum::serve(listener, http::build_router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    if tokio::time::timeout(settings.server.graceful_shutdown, coordinator.wait_idle())
        .await
        .is_err()
    {
        warn!(
            target = "sitesync::serve",
            "shutdown timeout elapsed while a build was still running"
        );
    }

    Ok(())
}

async fn run_build(settings: config::Settings) -> Result<(), AppError> {
    let pipeline = site_pipeline(&settings)?;
    let report = pipeline.build().await?;

    info!(
        target = "sitesync::build",
        posts = report.posts,
        services = report.services,
        testimonials = report.testimonials,
        pages = report.pages.len(),
        artifacts = report.artifacts.len(),
        elapsed_ms = report.elapsed_ms,
        "build finished"
    );
    print_json(&report, true)
}

async fn run_fetch(settings: config::Settings, args: FetchArgs) -> Result<(), AppError> {
    let fetcher = content_fetcher(&settings)?;

    match args.kind {
        FetchKind::Posts => print_json(&fetcher.blog_posts().await, args.pretty),
        FetchKind::Services => print_json(&fetcher.services().await, args.pretty),
        FetchKind::Testimonials => print_json(&fetcher.testimonials().await, args.pretty),
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), AppError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{rendered}");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "sitesync::serve",
            error = %err,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    info!(target = "sitesync::serve", "shutdown signal received");
}
